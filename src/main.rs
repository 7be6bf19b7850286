mod api;
mod app;
mod audio;
mod config;
mod library;
mod logging;
mod mpris;
mod runtime;
mod store;
mod task;
mod ui;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runtime::run()
}
