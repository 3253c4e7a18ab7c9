use log::*;
use screeps::game;
use wasm_bindgen::JsValue;

pub use log::LevelFilter::*;

struct JsLog;

impl Log for JsLog {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        web_sys::console::log_1(&JsValue::from_str(&record.args().to_string()));
    }

    fn flush(&self) {}
}

pub fn setup_logging(verbosity: LevelFilter) {
    let result = fern::Dispatch::new()
        .level(verbosity)
        .format(|out, message, record| {
            out.finish(format_args!("({}) {}: {}", record.level(), game::time(), message))
        })
        .chain(Box::new(JsLog) as Box<dyn Log>)
        .apply();

    //
    // NOTE: A second setup after a VM reload finds the logger already installed.
    //
    if result.is_err() {
        warn!("Logger already initialized");
    }
}
