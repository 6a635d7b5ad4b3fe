//! Unit-aware parsing for duration and byte-size strings.
//!
//! Accepts `<number><optional whitespace><unit>`, e.g. `12h`, `10 seconds`,
//! `10GB`, `512 KiB`. Bare numbers are milliseconds for durations and bytes
//! for sizes.

use regex_lite::Regex;
use std::sync::OnceLock;
use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

fn quantity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?)\s*([A-Za-z]*)\s*$")
            .expect("quantity regex is valid")
    })
}

/// Numeric part of a quantity, kept exact when it is an integer.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Amount {
    Integer(i128),
    Fractional(f64),
}

fn split_quantity(input: &str) -> Result<(Amount, &str), String> {
    let caps = quantity_regex()
        .captures(input)
        .ok_or_else(|| format!("'{}' is not a number with an optional unit", input))?;
    let number = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    let unit = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

    let amount = match number.parse::<i128>() {
        Ok(n) => Amount::Integer(n),
        Err(_) => number
            .parse::<f64>()
            .map(Amount::Fractional)
            .map_err(|e| format!("'{}': {}", number, e))?,
    };
    Ok((amount, unit))
}

fn duration_unit_nanos(unit: &str) -> Option<u128> {
    let nanos = match unit {
        "ns" | "nano" | "nanos" | "nanosecond" | "nanoseconds" => 1,
        "us" | "micro" | "micros" | "microsecond" | "microseconds" => 1_000,
        "" | "ms" | "milli" | "millis" | "millisecond" | "milliseconds" => 1_000_000,
        "s" | "second" | "seconds" => NANOS_PER_SEC,
        "m" | "minute" | "minutes" => 60 * NANOS_PER_SEC,
        "h" | "hour" | "hours" => 3_600 * NANOS_PER_SEC,
        "d" | "day" | "days" => 86_400 * NANOS_PER_SEC,
        _ => return None,
    };
    Some(nanos)
}

fn byte_unit_multiplier(unit: &str) -> Option<u128> {
    const KIB: u128 = 1 << 10;
    let multiplier = match unit {
        "" | "B" | "b" | "byte" | "bytes" => 1,

        "kB" | "kilobyte" | "kilobytes" => 1_000,
        "MB" | "megabyte" | "megabytes" => 1_000_000,
        "GB" | "gigabyte" | "gigabytes" => 1_000_000_000,
        "TB" | "terabyte" | "terabytes" => 1_000_000_000_000,
        "PB" | "petabyte" | "petabytes" => 1_000_000_000_000_000,
        "EB" | "exabyte" | "exabytes" => 1_000_000_000_000_000_000,

        "K" | "k" | "Ki" | "KiB" | "kibibyte" | "kibibytes" => KIB,
        "M" | "m" | "Mi" | "MiB" | "mebibyte" | "mebibytes" => KIB.pow(2),
        "G" | "g" | "Gi" | "GiB" | "gibibyte" | "gibibytes" => KIB.pow(3),
        "T" | "t" | "Ti" | "TiB" | "tebibyte" | "tebibytes" => KIB.pow(4),
        "P" | "p" | "Pi" | "PiB" | "pebibyte" | "pebibytes" => KIB.pow(5),
        "E" | "e" | "Ei" | "EiB" | "exbibyte" | "exbibytes" => KIB.pow(6),
        _ => return None,
    };
    Some(multiplier)
}

/// Parse a duration string such as `12h`, `10 seconds` or `250`.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let (amount, unit) = split_quantity(input)?;
    let nanos_per_unit =
        duration_unit_nanos(unit).ok_or_else(|| format!("unknown time unit '{}'", unit))?;

    match amount {
        Amount::Integer(n) if n < 0 => Err(format!("negative duration '{}'", input.trim())),
        Amount::Integer(n) => {
            let nanos = (n as u128)
                .checked_mul(nanos_per_unit)
                .ok_or_else(|| format!("duration '{}' is out of range", input.trim()))?;
            let secs = u64::try_from(nanos / NANOS_PER_SEC)
                .map_err(|_| format!("duration '{}' is out of range", input.trim()))?;
            Ok(Duration::new(secs, (nanos % NANOS_PER_SEC) as u32))
        }
        Amount::Fractional(v) => {
            let secs = v * nanos_per_unit as f64 / NANOS_PER_SEC as f64;
            Duration::try_from_secs_f64(secs)
                .map_err(|e| format!("duration '{}': {}", input.trim(), e))
        }
    }
}

/// Duration for a bare number, interpreted as milliseconds.
pub fn duration_from_millis(millis: f64) -> Result<Duration, String> {
    Duration::try_from_secs_f64(millis / 1_000.0).map_err(|e| format!("{}: {}", millis, e))
}

const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;

/// Parse a byte-size string such as `10GB`, `512 KiB` or `1024`.
///
/// Fractional amounts are truncated to whole bytes.
pub fn parse_bytes(input: &str) -> Result<u64, String> {
    let (amount, unit) = split_quantity(input)?;
    let multiplier =
        byte_unit_multiplier(unit).ok_or_else(|| format!("unknown size unit '{}'", unit))?;

    match amount {
        Amount::Integer(n) if n < 0 => Err(format!("negative size '{}'", input.trim())),
        Amount::Integer(n) => (n as u128)
            .checked_mul(multiplier)
            .and_then(|bytes| u64::try_from(bytes).ok())
            .ok_or_else(|| format!("size '{}' is out of range", input.trim())),
        Amount::Fractional(v) => {
            let bytes = (v * multiplier as f64).trunc();
            // u64::MAX is not representable as f64; 2^64 is the first value out of range.
            if !bytes.is_finite() || bytes < 0.0 || bytes >= U64_LIMIT {
                return Err(format!("size '{}' is out of range", input.trim()));
            }
            Ok(bytes as u64)
        }
    }
}
