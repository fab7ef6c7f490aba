//! Month ↔ port / file / unit mapping.
//!
//! This is the only place that knows how a month becomes a port number or a
//! file name. Everything else works with the derived [`PortAssignment`],
//! [`DataFileRef`] and [`LaunchUnitRef`] values.

use crate::config::{ManagerConfig, PortScheme};
use crate::core::{DataFileRef, LaunchUnitRef, ManagerError, PortAssignment, Result, Role, ShardKey};
use std::path::PathBuf;

const DATA_FILE_PREFIX: &str = "ssdata";
const DATA_FILE_EXTENSION: &str = "tch";
const UNIT_PREFIX: &str = "ttserver";
const UNIT_EXTENSION: &str = "conf";

#[derive(Debug, Clone)]
pub struct ShardResolver {
    scheme: PortScheme,
    data_directory: PathBuf,
    script_directory: PathBuf,
    log_directory: PathBuf,
}

impl ShardResolver {
    pub fn new(config: &ManagerConfig) -> Self {
        Self {
            scheme: config.port_scheme,
            data_directory: config.data_directory.clone(),
            script_directory: config.script_directory.clone(),
            log_directory: config.log_directory.clone(),
        }
    }

    pub fn scheme(&self) -> &PortScheme {
        &self.scheme
    }

    /// Ports of the month's master and slave.
    ///
    /// Fails with `InvalidShardKey` when the month is outside the range the
    /// port scheme can route.
    pub fn ports_for(&self, key: ShardKey) -> Result<PortAssignment> {
        let index = self.routable_index(key)?;
        let master_port = self.scheme.base_port as u32 + index;
        let slave_port = master_port + self.scheme.slave_offset as u32;

        // validated schemes keep both ports inside u16
        let to_port = |port: u32| {
            u16::try_from(port).map_err(|_| {
                ManagerError::InvalidShardKey(format!("{} maps to out-of-range port {}", key, port))
            })
        };

        Ok(PortAssignment {
            master_port: to_port(master_port)?,
            slave_port: to_port(slave_port)?,
        })
    }

    /// Inverse of [`ports_for`](Self::ports_for).
    pub fn shard_for_port(&self, port: u16) -> Option<(Role, ShardKey)> {
        let offset = (port as u32).checked_sub(self.scheme.base_port as u32)?;
        let capacity = self.scheme.capacity();
        let (role, index) = if offset < capacity {
            (Role::Master, offset)
        } else if offset < 2 * capacity {
            (Role::Slave, offset - capacity)
        } else {
            return None;
        };

        let epoch = ShardKey::new(self.scheme.epoch_year, 1).ok()?;
        let key = ShardKey::from_month_index(epoch.month_index() + index as i64).ok()?;
        Some((role, key))
    }

    pub fn data_file_for(&self, role: Role, key: ShardKey) -> DataFileRef {
        DataFileRef::new(self.data_directory.join(format!(
            "{}.{}",
            Self::data_stem(role, key),
            DATA_FILE_EXTENSION
        )))
    }

    pub fn unit_for(&self, role: Role, key: ShardKey) -> LaunchUnitRef {
        let name = format!("{}-{}-{}", UNIT_PREFIX, role, key.stamp());
        let path = self
            .script_directory
            .join(format!("{}.{}", name, UNIT_EXTENSION));
        LaunchUnitRef::new(name, path)
    }

    /// Signed month arithmetic with year rollover.
    pub fn shift_months(&self, key: ShardKey, months: i32) -> Result<ShardKey> {
        key.shift(months)
    }

    pub fn log_file_for(&self, role: Role, key: ShardKey) -> PathBuf {
        self.log_directory
            .join(format!("{}-{}-{}.log", UNIT_PREFIX, role, key.stamp()))
    }

    /// Update log directory a master writes and slaves replicate from.
    pub fn update_log_for(&self, role: Role, key: ShardKey) -> PathBuf {
        self.data_directory
            .join(format!("ulog-{}-{}", role, key.stamp()))
    }

    /// Replication timestamp file kept by a slave.
    pub fn replication_stamp_for(&self, key: ShardKey) -> PathBuf {
        self.data_directory
            .join(format!("{}.rts", Self::data_stem(Role::Slave, key)))
    }

    fn data_stem(role: Role, key: ShardKey) -> String {
        format!("{}-{}-{}", DATA_FILE_PREFIX, role, key.stamp())
    }

    fn routable_index(&self, key: ShardKey) -> Result<u32> {
        let epoch = key.month_index() - self.scheme.epoch_year as i64 * 12;
        if epoch < 0 || epoch >= self.scheme.capacity() as i64 {
            return Err(ManagerError::InvalidShardKey(format!(
                "{} is outside the routable range starting {}-01 ({} months)",
                key,
                self.scheme.epoch_year,
                self.scheme.capacity()
            )));
        }
        Ok(epoch as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::Path;

    fn resolver() -> ShardResolver {
        ShardResolver::new(&ManagerConfig::default())
    }

    fn key(year: i32, month: u32) -> ShardKey {
        ShardKey::new(year, month).unwrap()
    }

    #[test]
    fn test_known_ports() {
        let ports = resolver().ports_for(key(2011, 12)).unwrap();
        assert_eq!(ports.master_port, 10503);
        assert_eq!(ports.slave_port, 12503);

        let ports = resolver().ports_for(key(2012, 2)).unwrap();
        assert_eq!(ports.master_port, 10505);
        assert_eq!(ports.slave_port, 12505);
    }

    #[test]
    fn test_range_edges() {
        let resolver = resolver();
        assert_eq!(resolver.ports_for(key(1970, 1)).unwrap().master_port, 10000);
        assert_eq!(resolver.ports_for(key(2136, 8)).unwrap().master_port, 11999);
        assert_eq!(resolver.ports_for(key(2136, 8)).unwrap().slave_port, 13999);

        assert!(matches!(
            resolver.ports_for(key(1969, 12)),
            Err(ManagerError::InvalidShardKey(_))
        ));
        assert!(resolver.ports_for(key(2136, 9)).is_err());
    }

    #[test]
    fn test_ports_are_injective() {
        let resolver = resolver();
        let mut seen = HashSet::new();
        let mut key = key(1970, 1);
        for _ in 0..resolver.scheme().capacity() {
            let ports = resolver.ports_for(key).unwrap();
            assert!(seen.insert(ports.master_port), "duplicate port for {}", key);
            assert!(seen.insert(ports.slave_port), "duplicate port for {}", key);
            key = key.shift(1).unwrap();
        }
    }

    #[test]
    fn test_custom_scheme() {
        let config = ManagerConfig::default().port_scheme(PortScheme {
            base_port: 20000,
            epoch_year: 2000,
            slave_offset: 500,
        });
        let resolver = ShardResolver::new(&config);
        let ports = resolver.ports_for(key(2001, 3)).unwrap();
        assert_eq!(ports.master_port, 20014);
        assert_eq!(ports.slave_port, 20514);
        assert!(resolver.ports_for(key(1999, 12)).is_err());
    }

    #[test]
    fn test_shard_for_port_inverts_ports_for() {
        let resolver = resolver();
        for month in [key(1970, 1), key(2011, 12), key(2012, 2), key(2136, 8)] {
            let ports = resolver.ports_for(month).unwrap();
            assert_eq!(resolver.shard_for_port(ports.master_port), Some((Role::Master, month)));
            assert_eq!(resolver.shard_for_port(ports.slave_port), Some((Role::Slave, month)));
        }
        assert_eq!(resolver.shard_for_port(1978), None);
        assert_eq!(resolver.shard_for_port(14000), None);
    }

    #[test]
    fn test_file_and_unit_names() {
        let resolver = resolver();
        let month = key(2012, 2);

        assert_eq!(
            resolver.data_file_for(Role::Master, month).path(),
            Path::new("/data/tokyotyrant/ssdata-master-201202.tch")
        );
        assert_eq!(
            resolver.data_file_for(Role::Slave, month).path(),
            Path::new("/data/tokyotyrant/ssdata-slave-201202.tch")
        );

        let unit = resolver.unit_for(Role::Slave, month);
        assert_eq!(unit.name(), "ttserver-slave-201202");
        assert_eq!(unit.path(), Path::new("/etc/init/ttserver-slave-201202.conf"));

        assert_eq!(
            resolver.log_file_for(Role::Master, month),
            PathBuf::from("/var/log/tokyotyrant/ttserver-master-201202.log")
        );
        assert_eq!(
            resolver.replication_stamp_for(month),
            PathBuf::from("/data/tokyotyrant/ssdata-slave-201202.rts")
        );
    }

    #[test]
    fn test_derivations_are_deterministic() {
        let a = resolver();
        let b = resolver();
        let month = key(2012, 2);
        assert_eq!(a.unit_for(Role::Master, month), b.unit_for(Role::Master, month));
        assert_eq!(a.data_file_for(Role::Slave, month), b.data_file_for(Role::Slave, month));
        assert_eq!(a.ports_for(month).unwrap(), b.ports_for(month).unwrap());
    }

    #[test]
    fn test_shift_months_round_trip() {
        let resolver = resolver();
        for n in [-30, -13, -12, -1, 0, 1, 11, 12, 25] {
            for month in [key(2011, 1), key(2011, 12), key(2012, 6)] {
                let shifted = resolver.shift_months(month, n).unwrap();
                assert_eq!(resolver.shift_months(shifted, -n).unwrap(), month);
            }
        }
    }
}
