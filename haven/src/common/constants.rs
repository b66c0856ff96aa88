// doc constants
pub const DOC_ID: &str = "_id";
pub const FIELD_SEPARATOR: char = '.';

// text search approximates a text index over these fields
pub const TEXT_SEARCH_FIELDS: [&str; 3] = ["name", "summary", "tags"];

// dns constants
pub const DEFAULT_DOH_ENDPOINT: &str = "https://cloudflare-dns.com/dns-query";
pub const DNS_JSON_CONTENT_TYPE: &str = "application/dns-json";
pub const DEFAULT_DOH_TIMEOUT_MS: u64 = 6000;
pub const MAX_CNAME_HOPS: usize = 6;
pub const DEFAULT_MANAGED_DOMAIN_SUFFIX: &str = ".mongodb.net";
pub const DEFAULT_SRV_SERVICE: &str = "mongodb";

// connection constants
pub const SRV_SCHEME: &str = "mongodb+srv";
pub const DIRECT_SCHEME: &str = "mongodb";
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 1500;
pub const DEFAULT_SELECTION_TIMEOUT_MS: u64 = 1500;
pub const DEFAULT_DATABASE_NAME: &str = "app";
pub const INITIAL_SEED_VERSION: u32 = 1;

// environment variables
pub const ENV_DATABASE_URI: &str = "HAVEN_DATABASE_URI";
pub const ENV_DATABASE_NAME: &str = "HAVEN_DATABASE_NAME";
pub const ENV_DOH_ENDPOINT: &str = "HAVEN_DOH_ENDPOINT";
pub const ENV_SEED_VERSION: &str = "HAVEN_SEED_VERSION";
