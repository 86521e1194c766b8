//! # Quantum-Chain Messaging Benchmarks
//!
//! | Area | Claim | Target |
//! |------|-------|--------|
//! | Envelope codec | Fixed-width prefix | < 1µs |
//! | Options combine | Linear in caller entries | < 10µs for 256 entries |
//! | Ping-pong | Forward + return over in-memory network | < 1ms |

use criterion::{criterion_group, criterion_main};
use qc_tests::benchmarks::qc_15_messaging::register_benchmarks;

criterion_group!(benches, register_benchmarks);

criterion_main!(benches);
