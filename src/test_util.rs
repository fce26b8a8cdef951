use std::sync::Once;

static INIT: Once = Once::new();

pub(crate) fn setup() {
    INIT.call_once(|| {
        // Another test binary may already own the global logger
        let _ = simple_logger::init_with_level(log::Level::Debug);
    });
}
