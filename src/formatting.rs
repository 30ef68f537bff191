//! Utilidades de formato compartidas por los extractores y el normalizador.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Timelike};
use std::time::SystemTime;

pub fn system_time_to_local(time: SystemTime) -> NaiveDateTime {
    let datetime: DateTime<Local> = time.into();
    datetime.naive_local()
}

/// Representación ISO-8601 con microsegundos solo cuando no son cero.
pub fn format_iso_naive(value: &NaiveDateTime) -> String {
    let mut output = value.format("%Y-%m-%dT%H:%M:%S").to_string();
    let micros = value.nanosecond() / 1_000;
    if micros > 0 {
        output.push_str(&format!(".{micros:06}"));
    }
    output
}

pub fn format_iso_zoned(value: &DateTime<FixedOffset>) -> String {
    let mut output = format_iso_naive(&value.naive_local());
    output.push_str(&value.format("%:z").to_string());
    output
}

pub fn format_size_kb(bytes: u64) -> String {
    format!("{:.0} kB", bytes as f64 / 1024.0)
}

/// Octetos en hexadecimal mayúscula separados por un espacio.
pub fn format_hex_octets(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample(micro: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|date| date.and_hms_micro_opt(7, 5, 1, micro))
            .expect("fecha válida")
    }

    #[test]
    fn iso_naive_omits_zero_fraction() {
        assert_eq!(format_iso_naive(&sample(0)), "2024-03-09T07:05:01");
        assert_eq!(format_iso_naive(&sample(420)), "2024-03-09T07:05:01.000420");
    }

    #[test]
    fn iso_zoned_appends_offset() {
        let offset = FixedOffset::east_opt(3600).expect("offset válido");
        let zoned = sample(0)
            .and_local_timezone(offset)
            .single()
            .expect("hora local no ambigua");
        assert_eq!(format_iso_zoned(&zoned), "2024-03-09T07:05:01+01:00");
    }

    #[test]
    fn hex_octets_are_uppercase_and_spaced() {
        assert_eq!(format_hex_octets(&[0xFF, 0xD8, 0x0a]), "FF D8 0A");
        assert_eq!(format_hex_octets(&[]), "");
    }

    #[test]
    fn megapixel_rounding_is_half_up() {
        assert_eq!(round_one_decimal(5_000.0 / 1_000_000.0), 0.0);
        assert_eq!(round_one_decimal(0.25), 0.3);
        assert_eq!(round_one_decimal(12.0), 12.0);
    }

    #[test]
    fn size_is_rendered_in_kilobytes() {
        assert_eq!(format_size_kb(4096), "4 kB");
        assert_eq!(format_size_kb(0), "0 kB");
    }
}
