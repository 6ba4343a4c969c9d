
pub use self_test::handle_self_test;
