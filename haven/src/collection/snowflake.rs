use log::{debug, warn};
use rand::rngs::OsRng;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;

fn current_time_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Generates roughly time-ordered 64-bit identifiers from a millisecond
/// timestamp, a random node id and a per-process sequence.
pub(crate) struct SnowflakeIdGenerator {
    node_id: u64,
    sequence: AtomicU64,
    last_timestamp: AtomicU64,
    sequence_bits: u64,
    sequence_mask: u64,
    timestamp_left_shift: u64,
    epoch: u64,
    mutex: Mutex<()>,
}

impl SnowflakeIdGenerator {
    pub fn new() -> Self {
        let node_id_bits = 10;
        let sequence_bits = 12;
        let max_node_id = (1_u64 << node_id_bits) - 1;
        let sequence_mask = (1_u64 << sequence_bits) - 1;
        let timestamp_left_shift = sequence_bits + node_id_bits;
        let epoch = 1288834974657;

        let mut generator = SnowflakeIdGenerator {
            node_id: 0,
            sequence: AtomicU64::new(0),
            last_timestamp: AtomicU64::new(0),
            sequence_bits,
            sequence_mask,
            timestamp_left_shift,
            epoch,
            mutex: Mutex::new(()),
        };

        generator.node_id = generator.random_node_id();
        if generator.node_id > max_node_id {
            warn!("Node id can't be greater than {}", max_node_id);
            generator.node_id = OsRng.gen_range(1..=max_node_id);
        }
        debug!("Initialized id generator with node id: {}", generator.node_id);

        generator
    }

    pub fn get_id(&self) -> u64 {
        let _lock = self.mutex.lock();

        let current_time = current_time_millis();
        let mut timestamp = current_time;
        let last_timestamp = self.last_timestamp.load(Ordering::Relaxed);
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) & self.sequence_mask;

        // clock moved backwards or sequence wrapped within the same millisecond
        if timestamp < last_timestamp || (timestamp == last_timestamp && sequence == 0) {
            timestamp = last_timestamp.max(timestamp) + 1;
            let sleep_duration = timestamp.saturating_sub(current_time);
            if sleep_duration > 0 {
                std::thread::sleep(std::time::Duration::from_millis(sleep_duration));
            }
        }

        self.last_timestamp.store(timestamp, Ordering::Relaxed);

        ((timestamp - self.epoch) << self.timestamp_left_shift)
            | (self.node_id << self.sequence_bits)
            | sequence
    }

    fn random_node_id(&self) -> u64 {
        let uuid = uuid::Uuid::new_v4();
        let uid = uuid.as_bytes();
        let rnd_byte = OsRng.gen::<u64>() & 0x000000FF;

        ((0x000000FF & uid[uid.len() - 1] as u64) | (0x0000FF00 & (rnd_byte << 8))) >> 6
    }
}
