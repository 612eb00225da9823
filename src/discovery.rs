//! Device discovery via mDNS (`avahi-browse`).

use std::collections::HashSet;
use std::process::Stdio;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::time::Instant;

use crate::config::AppConfig;
use crate::device::{DeviceAddress, DeviceInfo};
use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Service type Key Lights advertise.
pub const SERVICE_TYPE: &str = "_elg._tcp";

struct Browse {
    // Held so the process is killed when the stream is dropped.
    _child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    deadline: Instant,
    seen: HashSet<String>,
}

/// Discover Key Lights on the local network.
///
/// Lights are yielded as `avahi-browse` resolves them, until it finishes or
/// `discovery_timeout` elapses, whichever comes first. Lights that do not
/// answer in time are simply absent. When `avahi-browse` is not installed
/// the stream is empty and a warning is logged.
///
/// # Examples
///
/// ```ignore
/// use std::time::Duration;
/// use futures::StreamExt;
/// use elgato_keylight::discover;
///
/// let mut lights = discover(Duration::from_secs(5))?;
/// while let Some(light) = lights.next().await {
///     println!("{} at {}", light.name, light.address);
/// }
/// ```
pub fn discover(discovery_timeout: Duration) -> Result<BoxStream<'static, DeviceInfo>> {
    let spawned = Command::new("avahi-browse")
        .args(["-rpt", SERVICE_TYPE])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn();

    let mut child = match spawned {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                "avahi-browse not found; install avahi or list lights in {}",
                crate::config::default_config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "the config file".to_string())
            );
            return Ok(stream::empty().boxed());
        }
        Err(e) => return Err(Error::discovery("spawn", e)),
    };

    let Some(stdout) = child.stdout.take() else {
        return Err(Error::discovery(
            "spawn",
            std::io::Error::other("avahi-browse stdout not captured"),
        ));
    };

    let browse = Browse {
        _child: child,
        lines: BufReader::new(stdout).lines(),
        deadline: Instant::now() + discovery_timeout,
        seen: HashSet::new(),
    };

    Ok(stream::unfold(browse, |mut browse| async move {
        loop {
            let next = tokio::time::timeout_at(browse.deadline, browse.lines.next_line());
            let line = match next.await {
                Ok(Ok(Some(line))) => line,
                Ok(Ok(None)) => return None,
                Ok(Err(e)) => {
                    warn!("reading avahi-browse output failed: {e}");
                    return None;
                }
                Err(_) => {
                    debug!("discovery window closed");
                    return None;
                }
            };
            if let Some(device) = parse_line(&line)
                && browse.seen.insert(device.address.host.clone())
            {
                return Some((device, browse));
            }
        }
    })
    .boxed())
}

/// Discover for `discovery_timeout` and return every light found, sorted by name.
pub async fn discover_all(discovery_timeout: Duration) -> Result<Vec<DeviceInfo>> {
    let mut devices: Vec<DeviceInfo> = discover(discovery_timeout)?.collect().await;
    devices.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(devices)
}

/// The lights to operate on: the configured ones verbatim when the config
/// lists any, otherwise whatever discovery finds.
pub async fn resolve_devices(
    config: &AppConfig,
    discovery_timeout: Duration,
) -> Result<Vec<DeviceInfo>> {
    if !config.lights.is_empty() {
        debug!("using {} configured lights, skipping discovery", config.lights.len());
        return Ok(config.devices());
    }
    discover_all(discovery_timeout).await
}

/// Keep the devices whose name is in `names`; an empty filter keeps all.
pub fn select(devices: Vec<DeviceInfo>, names: &[String]) -> Vec<DeviceInfo> {
    if names.is_empty() {
        return devices;
    }
    devices
        .into_iter()
        .filter(|d| names.iter().any(|n| n.eq_ignore_ascii_case(&d.name)))
        .collect()
}

/// Parse the full output of `avahi-browse -rpt`, one device per host.
pub fn parse_avahi_output(output: &str) -> Vec<DeviceInfo> {
    let mut seen = HashSet::new();
    output
        .lines()
        .filter_map(parse_line)
        .filter(|d| seen.insert(d.address.host.clone()))
        .collect()
}

// Resolved records look like:
// =;iface;IPv4;instance;_elg._tcp;local;hostname;address;port;"k=v" "k=v"
fn parse_line(line: &str) -> Option<DeviceInfo> {
    let parts: Vec<&str> = line.split(';').collect();
    if parts.first() != Some(&"=") || parts.get(2) != Some(&"IPv4") {
        return None;
    }
    if parts.len() < 9 {
        warn!("skipping truncated avahi record: {line}");
        return None;
    }

    let host = parts[7];
    let Ok(port) = parts[8].parse::<u16>() else {
        warn!("skipping avahi record for {host} with bad port {:?}", parts[8]);
        return None;
    };

    let txt = parts[9..].join(";");
    let records = parse_txt(&txt);
    let Some(id) = txt_value(&records, "id").filter(|id| !id.is_empty()) else {
        warn!("skipping avahi record for {host}: no hardware id in TXT record");
        return None;
    };

    let name = short_name(&unescape(parts[3]));
    Some(
        DeviceInfo::new(id, &name, DeviceAddress::new(host, port))
            .with_model(txt_value(&records, "md")),
    )
}

/// "Elgato Key Light - right" becomes "right".
fn short_name(instance: &str) -> String {
    let name = match instance.split_once(" - ") {
        Some((_, short)) => short.trim(),
        None => instance.trim(),
    };
    name.to_lowercase()
}

/// Decode avahi's `\DDD` (decimal) and `\c` escapes.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let digits: String = std::iter::from_fn(|| chars.next_if(|d| d.is_ascii_digit()))
            .take(3)
            .collect();
        if digits.len() == 3
            && let Some(decoded) = digits.parse::<u32>().ok().and_then(char::from_u32)
        {
            out.push(decoded);
        } else if digits.is_empty() {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push('\\');
            out.push_str(&digits);
        }
    }
    out
}

/// Split `"k=v" "k=v"` into pairs. Values may contain spaces.
fn parse_txt(txt: &str) -> Vec<(&str, &str)> {
    txt.split('"')
        .skip(1)
        .step_by(2)
        .filter_map(|entry| entry.split_once('='))
        .collect()
}

fn txt_value<'a>(records: &[(&str, &'a str)], key: &str) -> Option<&'a str> {
    records.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = concat!(
        "+;wlp3s0;IPv4;Elgato\\032Key\\032Light\\032-\\032Right;_elg._tcp;local\n",
        "=;wlp3s0;IPv6;Elgato\\032Key\\032Light\\032-\\032Right;_elg._tcp;local;elgato-key-light-right.local;fe80::1;9123;\"id=3C:6A:9D:00:00:01\"\n",
        "=;wlp3s0;IPv4;Elgato\\032Key\\032Light\\032-\\032Right;_elg._tcp;local;elgato-key-light-right.local;192.168.0.60;9123;\"mf=Elgato\" \"dt=53\" \"id=3C:6A:9D:00:00:01\" \"md=Elgato Key Light 20GAK9901\" \"pv=1.0\"\n",
        "=;wlp3s0;IPv4;Elgato\\032Key\\032Light\\032-\\032Left;_elg._tcp;local;elgato-key-light-left.local;192.168.0.62;9123;\"id=3C:6A:9D:00:00:02\" \"md=Elgato Key Light 20GAK9901\"\n",
        "=;eth0;IPv4;Elgato\\032Key\\032Light\\032-\\032Left;_elg._tcp;local;elgato-key-light-left.local;192.168.0.62;9123;\"id=3C:6A:9D:00:00:02\"\n",
        "=;wlp3s0;IPv4;Elgato\\032Key\\032Light\\032AB12;_elg._tcp;local;elgato-key-light-ab12.local;192.168.0.63;notaport;\"id=3C:6A:9D:00:00:03\"\n",
        "=;wlp3s0;IPv4;Elgato\\032Key\\032Light\\032CD34;_elg._tcp;local;elgato-key-light-cd34.local;192.168.0.64;9123;\"md=Elgato Key Light\"\n",
        "=;wlp3s0;IPv4;truncated\n",
    );

    #[test]
    fn test_parse_resolved_ipv4_records() {
        let devices = parse_avahi_output(OUTPUT);
        assert_eq!(devices.len(), 2);

        let right = &devices[0];
        assert_eq!(right.name, "right");
        assert_eq!(right.id, "3C:6A:9D:00:00:01");
        assert_eq!(right.address, DeviceAddress::new("192.168.0.60", 9123));
        assert_eq!(right.model.as_deref(), Some("Elgato Key Light 20GAK9901"));

        // Seen on two interfaces, reported once.
        assert_eq!(devices[1].name, "left");
        assert_eq!(devices[1].address.host, "192.168.0.62");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("Elgato\\032Key\\032Light"), "Elgato Key Light");
        assert_eq!(unescape("a\\.b\\\\c"), "a.b\\c");
        assert_eq!(unescape("short\\03"), "short\\03");
    }

    #[test]
    fn test_short_name_without_suffix() {
        assert_eq!(short_name("Elgato Key Light AB12"), "elgato key light ab12");
        assert_eq!(short_name("Elgato Key Light - Desk "), "desk");
    }

    #[test]
    fn test_select_by_name() {
        let devices = parse_avahi_output(OUTPUT);
        let picked = select(devices.clone(), &["LEFT".to_string()]);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].name, "left");
        assert_eq!(select(devices, &[]).len(), 2);
    }

    #[tokio::test]
    async fn test_configured_lights_skip_discovery() {
        let config: AppConfig = "[[lights]]\nname = \"right\"\nhost = \"10.9.9.9\"\n"
            .parse()
            .unwrap();
        let devices = resolve_devices(&config, Duration::from_millis(1)).await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].address.host, "10.9.9.9");
    }
}
