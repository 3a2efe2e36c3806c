// libs/scheduling-cell/src/services/code.rs
use rand::Rng;

pub const CODE_PREFIX: &str = "APT";

/// `APT-<last 6 digits of the millisecond timestamp>-<3-digit random>`.
pub fn format_code(epoch_millis: i64, random: u16) -> String {
    format!(
        "{}-{:06}-{:03}",
        CODE_PREFIX,
        epoch_millis.rem_euclid(1_000_000),
        random % 1000
    )
}

pub fn generate_code(epoch_millis: i64) -> String {
    let random = rand::thread_rng().gen_range(0..1000);
    format_code(epoch_millis, random)
}
