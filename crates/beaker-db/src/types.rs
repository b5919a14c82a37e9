//! Wire decoders for column types the driver has no `FromSql` for.
//!
//! Each one turns the binary representation into the text PostgreSQL itself
//! would print.

use postgres::types::{FromSql, Kind, Type};
use std::error::Error;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

type FromSqlResult<T> = Result<T, Box<dyn Error + Sync + Send>>;

/// An enum label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EnumLabel(pub String);

impl<'a> FromSql<'a> for EnumLabel {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> FromSqlResult<Self> {
        Ok(EnumLabel(std::str::from_utf8(raw)?.to_owned()))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(ty.kind(), Kind::Enum(_))
    }
}

/// `interval`: months, days and microseconds kept apart, as the server does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Interval {
    pub months: i32,
    pub days: i32,
    pub micros: i64,
}

impl<'a> FromSql<'a> for Interval {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> FromSqlResult<Self> {
        if raw.len() != 16 {
            return Err(format!("invalid interval length {}", raw.len()).into());
        }
        Ok(Interval {
            micros: i64::from_be_bytes(raw[0..8].try_into()?),
            days: i32::from_be_bytes(raw[8..12].try_into()?),
            months: i32::from_be_bytes(raw[12..16].try_into()?),
        })
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INTERVAL
    }
}

fn unit(n: i64, name: &str) -> String {
    if n.abs() == 1 {
        format!("{n} {name}")
    } else {
        format!("{n} {name}s")
    }
}

// Same layout as the server's default `IntervalStyle = postgres`.
impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        let years = i64::from(self.months / 12);
        let months = i64::from(self.months % 12);
        if years != 0 {
            parts.push(unit(years, "year"));
        }
        if months != 0 {
            parts.push(unit(months, "mon"));
        }
        if self.days != 0 {
            parts.push(unit(i64::from(self.days), "day"));
        }
        if self.micros != 0 || parts.is_empty() {
            let sign = if self.micros < 0 { "-" } else { "" };
            let abs = self.micros.unsigned_abs();
            let secs = abs / 1_000_000;
            let frac = abs % 1_000_000;
            let mut time = format!(
                "{sign}{:02}:{:02}:{:02}",
                secs / 3600,
                secs / 60 % 60,
                secs % 60
            );
            if frac != 0 {
                let digits = format!("{frac:06}");
                time.push('.');
                time.push_str(digits.trim_end_matches('0'));
            }
            parts.push(time);
        }
        f.write_str(&parts.join(" "))
    }
}

/// `inet` / `cidr` as `address[/bits]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Inet(pub String);

impl<'a> FromSql<'a> for Inet {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> FromSqlResult<Self> {
        let [_family, bits, _is_cidr, len, addr @ ..] = raw else {
            return Err("invalid inet value".into());
        };
        if addr.len() != usize::from(*len) {
            return Err("invalid inet address length".into());
        }
        let (ip, full) = match addr.len() {
            4 => (IpAddr::V4(Ipv4Addr::from(<[u8; 4]>::try_from(addr)?)), 32),
            16 => (IpAddr::V6(Ipv6Addr::from(<[u8; 16]>::try_from(addr)?)), 128),
            n => return Err(format!("invalid inet address length {n}").into()),
        };
        let text = if *ty == Type::CIDR || *bits != full {
            format!("{ip}/{bits}")
        } else {
            ip.to_string()
        };
        Ok(Inet(text))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::INET || *ty == Type::CIDR
    }
}
