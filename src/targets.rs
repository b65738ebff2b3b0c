use ipnetwork::IpNetwork;

use crate::config::ProbeConfig;
use crate::error::TargetError;

/// Largest range a single entry may expand to.
pub const MAX_RANGE_SIZE: u128 = 65_536;

/// Turns user input into the host list handed to the manager.
///
/// Entries containing `/` are CIDR ranges and expand to their addresses,
/// optionally without the network and broadcast ends. Anything else is
/// passed through as a hostname or address. Blank entries are dropped.
pub fn expand_hosts<S: AsRef<str>>(
    entries: &[S],
    config: &ProbeConfig,
) -> Result<Vec<String>, TargetError> {
    let mut hosts = Vec::new();

    for entry in entries {
        let entry = entry.as_ref().trim();
        if entry.is_empty() {
            continue;
        }
        if entry.contains('/') {
            expand_range(entry, config, &mut hosts)?;
        } else {
            hosts.push(entry.to_string());
        }
    }

    Ok(hosts)
}

fn expand_range(
    entry: &str,
    config: &ProbeConfig,
    hosts: &mut Vec<String>,
) -> Result<(), TargetError> {
    let network: IpNetwork = entry
        .parse()
        .map_err(|_| TargetError::InvalidNetwork(entry.to_string()))?;

    let bits = if network.is_ipv4() { 32 } else { 128 };
    let host_bits = u32::from(bits - network.prefix());
    let size = 1u128.checked_shl(host_bits).unwrap_or(u128::MAX);
    if size > MAX_RANGE_SIZE {
        return Err(TargetError::TooLarge {
            entry: entry.to_string(),
            size,
            limit: MAX_RANGE_SIZE,
        });
    }

    // /31, /32 and their v6 equivalents have no network or broadcast address
    let trimmable = size > 2;
    let skip_first = usize::from(trimmable && config.skip_cidr_first_addr);
    let skip_last = usize::from(trimmable && config.skip_cidr_last_addr);
    let take = size as usize - skip_first - skip_last;

    match network {
        IpNetwork::V4(net) => hosts.extend(
            net.iter()
                .skip(skip_first)
                .take(take)
                .map(|addr| addr.to_string()),
        ),
        IpNetwork::V6(net) => hosts.extend(
            net.iter()
                .skip(skip_first)
                .take(take)
                .map(|addr| addr.to_string()),
        ),
    }
    Ok(())
}
