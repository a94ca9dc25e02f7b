//! HTTP gateway for the seat allocation core
//!
//! This binary is the external collaborator the core trusts: it does no
//! authentication beyond reading an `X-User-Id` header and holds no
//! correctness logic. Gateway threads share one `tiny_http` server and
//! call straight into the [`BookingService`] trait.

#![warn(missing_docs)]

mod http;

use std::thread;
use std::time::Duration;

use railbook_core::Config;

/// Command line options
#[derive(Debug)]
struct Opts {
    /// Configuration of the seat allocation system
    config: Config,

    /// Port for the HTTP server to listen on
    port: u16,
    /// Host for the HTTP server to listen on
    host: String,
    /// Number of gateway threads
    gateway_threads: u32,
}

impl Opts {
    fn from_args() -> Self {
        let mut opts = Opts {
            port: 8660,
            host: String::from("127.0.0.1"),
            config: Config::default(),
            gateway_threads: 16,
        };

        let mut option: Option<String> = None;
        for arg in std::env::args().skip(1) {
            if let Some(opt) = option {
                match opt.as_str() {
                    "-port" => opts.port = arg.parse().expect("-port takes a decimal u16"),
                    "-host" => opts.host = arg,
                    "-workers" => {
                        opts.config.workers = arg.parse().expect("-workers takes a decimal u32")
                    }
                    "-max-retries" => {
                        opts.config.max_retries =
                            arg.parse().expect("-max-retries takes a decimal u32")
                    }
                    "-retry-backoff-us" => {
                        let micros: u64 =
                            arg.parse().expect("-retry-backoff-us takes a decimal u64");
                        opts.config.retry_backoff = if micros == 0 {
                            None
                        } else {
                            Some(Duration::from_micros(micros))
                        };
                    }
                    "-gateway-threads" => {
                        opts.gateway_threads =
                            arg.parse().expect("-gateway-threads takes a decimal u32")
                    }
                    _ => {
                        eprintln!("Error: ignoring unknown option {opt}");
                        std::process::exit(1);
                    }
                }
                option = None;
            } else {
                option = Some(arg);
            }
        }
        if let Some(opt) = option {
            eprintln!("Error: option {opt} is missing its value");
            std::process::exit(1);
        }

        opts
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opts = Opts::from_args();

    let server = tiny_http::Server::http((opts.host.as_str(), opts.port)).unwrap();
    let system = railbook_engine::launch(&opts.config);
    tracing::info!(host = %opts.host, port = opts.port, "gateway listening");

    thread::scope(|s| {
        for i in 0..opts.gateway_threads {
            thread::Builder::new()
                .name(format!("gateway_{i}"))
                .spawn_scoped(s, || loop {
                    let rq = server.recv().expect("HTTP receive failed");
                    http::handle(rq, &system);
                })
                .unwrap();
        }
    });
}
