mod manager_test;

#[ctor::ctor]
fn init() {
    colog::init();
}
