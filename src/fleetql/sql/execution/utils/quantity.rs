//! Resource-quantity coercion.
//!
//! Inventory backends report CPU and memory as Kubernetes-style quantity
//! strings ("250m", "0.5", "1Gi"). Fields tagged `cpu-quantity` or
//! `memory-quantity` in the schema are converted to plain numbers
//! (millicores / MiB) during extraction so ordering comparisons and
//! aggregates work on them.

/// Convert a CPU quantity to millicores.
///
/// `"100m"` -> 100, `"0.5"` -> 500, `"1"` -> 1000, `"2.5"` -> 2500.
/// Empty input is treated as zero.
pub fn parse_cpu_millicores(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return Some(0);
    }

    if let Some(millis) = value.strip_suffix('m') {
        return millis.parse::<i64>().ok();
    }

    let cores = value.parse::<f64>().ok()?;
    Some((cores * 1000.0) as i64)
}

/// Convert a memory quantity to MiB.
///
/// Binary suffixes (`Ki`, `Mi`, `Gi`, `Ti`, `Pi`, `Ei`), decimal suffixes
/// (`k`/`K`, `M`, `G`, `T`), and bare byte counts are supported; a bare
/// number without a suffix is taken as MiB, matching the convention the
/// backends use. Empty input is treated as zero.
pub fn parse_memory_mib(value: &str) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return Some(0);
    }

    let split = value
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number = number.trim().parse::<f64>().ok()?;

    let mib = match unit {
        "Ki" => number / 1024.0,
        "Mi" | "" => number,
        "Gi" => number * 1024.0,
        "Ti" => number * 1024.0 * 1024.0,
        "Pi" => number * 1024.0 * 1024.0 * 1024.0,
        "Ei" => number * 1024.0 * 1024.0 * 1024.0 * 1024.0,
        // Decimal units, less common but reported by some backends
        "k" | "K" => number * 1000.0 / 1024.0 / 1024.0,
        "M" => number * 1_000_000.0 / 1024.0 / 1024.0,
        "G" => number * 1_000_000_000.0 / 1024.0 / 1024.0,
        "T" => number * 1_000_000_000_000.0 / 1024.0 / 1024.0,
        // Unknown suffix: assume bytes
        _ => number / 1024.0 / 1024.0,
    };

    Some(mib as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_millicores() {
        assert_eq!(parse_cpu_millicores("100m"), Some(100));
        assert_eq!(parse_cpu_millicores("0.5"), Some(500));
        assert_eq!(parse_cpu_millicores("1"), Some(1000));
        assert_eq!(parse_cpu_millicores("2.5"), Some(2500));
        assert_eq!(parse_cpu_millicores(""), Some(0));
        assert_eq!(parse_cpu_millicores("abc"), None);
    }

    #[test]
    fn test_memory_mib() {
        assert_eq!(parse_memory_mib("128Mi"), Some(128));
        assert_eq!(parse_memory_mib("1Gi"), Some(1024));
        assert_eq!(parse_memory_mib("512Mi"), Some(512));
        assert_eq!(parse_memory_mib("1024Ki"), Some(1));
        assert_eq!(parse_memory_mib("2Ti"), Some(2 * 1024 * 1024));
        assert_eq!(parse_memory_mib("64"), Some(64));
        assert_eq!(parse_memory_mib(""), Some(0));
        assert_eq!(parse_memory_mib("x"), None);
    }
}
