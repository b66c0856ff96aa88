mod cursor_test;
mod delete_test;
mod find_test;
mod insert_test;
mod update_test;

#[ctor::ctor]
fn init() {
    colog::init();
}
