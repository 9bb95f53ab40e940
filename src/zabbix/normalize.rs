//! Rewrites select raw item values into human units before they leave
//! the provider. `value` and `units` always change together.

/// Scales a raw bits-per-second value to the largest fitting unit.
pub fn scale_bits_per_second(bps: f64) -> (String, &'static str) {
    if bps >= 1e9 {
        (format!("{:.2}", bps / 1e9), "Gbps")
    } else if bps >= 1e6 {
        (format!("{:.2}", bps / 1e6), "Mbps")
    } else if bps >= 1e3 {
        (format!("{:.2}", bps / 1e3), "Kbps")
    } else {
        (format!("{}", bps.round() as i64), "bps")
    }
}

pub fn fan_status_label(code: &str) -> Option<&'static str> {
    match code.trim() {
        "1" => Some("Normal"),
        "2" => Some("Warning"),
        "3" => Some("Critical"),
        "4" => Some("Shutdown"),
        _ => None,
    }
}

/// IANA ifType names for the interface types network gear reports most.
pub fn interface_type_label(code: &str) -> Option<&'static str> {
    let label = match code.trim() {
        "1" => "other",
        "6" => "ethernetCsmacd",
        "23" => "ppp",
        "24" => "softwareLoopback",
        "53" => "propVirtual",
        "71" => "ieee80211",
        "117" => "gigabitEthernet",
        "131" => "tunnel",
        "135" => "l2vlan",
        "136" => "l3ipvlan",
        "161" => "ieee8023adLag",
        "209" => "bridge",
        _ => return None,
    };
    Some(label)
}

/// Returns the normalized `(value, units)` pair for an item.
pub fn normalize_item_value(name: &str, key: &str, value: &str, units: &str) -> (String, String) {
    let name = name.to_lowercase();
    let key = key.to_lowercase();
    let mentions = |needle: &str| name.contains(needle) || key.contains(needle);

    if mentions("fan") && (mentions("status") || mentions("state")) {
        if let Some(label) = fan_status_label(value) {
            return (label.to_string(), String::new());
        }
    }

    if mentions("iftype") || name.contains("interface type") {
        if let Some(label) = interface_type_label(value) {
            return (label.to_string(), String::new());
        }
    }

    if (mentions("speed") || mentions("ifspeed")) && units.trim().eq_ignore_ascii_case("bps") {
        if let Ok(bps) = value.trim().parse::<f64>() {
            let (scaled, unit) = scale_bits_per_second(bps);
            return (scaled, unit.to_string());
        }
    }

    (value.to_string(), units.to_string())
}
