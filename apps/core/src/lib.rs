pub mod config;
pub mod contract;
pub mod debounce;
pub mod dispatcher;
pub mod engine;
pub mod filters;
pub mod index_service;
pub mod inline_answer;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod os_integration;
pub mod readiness;
pub mod runtime;
pub mod selection;
pub mod transport;

#[cfg(test)]
mod tests {
    mod dispatch_latency_test {
        include!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../tests/perf/dispatch_latency_test.rs"
        ));
    }
}
