use super::error::{ManagerError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ============================================================================
// Shard Key
// ============================================================================

/// One monthly partition of the fleet.
///
/// Built from any date by truncating it to its month. The `YYYYMM` stamp is
/// what unit and data file names are derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShardKey {
    year: i32,
    month: u32,
}

impl ShardKey {
    pub const MIN_YEAR: i32 = 1;
    pub const MAX_YEAR: i32 = 9999;

    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(Self::MIN_YEAR..=Self::MAX_YEAR).contains(&year) {
            return Err(ManagerError::InvalidShardKey(format!(
                "year {} is outside {}..={}",
                year,
                Self::MIN_YEAR,
                Self::MAX_YEAR
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(ManagerError::InvalidShardKey(format!(
                "month {} is outside 1..=12",
                month
            )));
        }
        Ok(Self { year, month })
    }

    /// Truncates a date to its month.
    pub fn from_date(date: NaiveDate) -> Result<Self> {
        Self::new(date.year(), date.month())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First calendar day of the month.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .expect("shard key fields are validated on construction")
    }

    /// Months elapsed since January of year 0.
    pub fn month_index(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    pub(crate) fn from_month_index(index: i64) -> Result<Self> {
        let year = index.div_euclid(12);
        let month = index.rem_euclid(12) as u32 + 1;
        let year = i32::try_from(year)
            .map_err(|_| ManagerError::InvalidShardKey(format!("year {} overflows", year)))?;
        Self::new(year, month)
    }

    /// Moves the key by a signed number of months, rolling years over in
    /// both directions.
    pub fn shift(&self, months: i32) -> Result<Self> {
        Self::from_month_index(self.month_index() + months as i64)
    }

    /// Compact `YYYYMM` form used in file and unit names.
    pub fn stamp(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }
}

impl fmt::Display for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for ShardKey {
    type Err = ManagerError;

    /// Accepts `YYYY-MM`, `YYYYMM` or a full `YYYY-MM-DD` date.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Self::from_date(date);
        }

        let (year, month) = match s.split_once('-') {
            Some((year, month)) => (year, month),
            None if s.len() == 6 && s.is_ascii() => s.split_at(4),
            None => {
                return Err(ManagerError::InvalidShardKey(format!(
                    "cannot parse '{}' as a month (expected YYYY-MM or YYYYMM)",
                    s
                )));
            }
        };

        let year = year
            .parse::<i32>()
            .map_err(|_| ManagerError::InvalidShardKey(format!("invalid year in '{}'", s)))?;
        let month = month
            .parse::<u32>()
            .map_err(|_| ManagerError::InvalidShardKey(format!("invalid month in '{}'", s)))?;
        Self::new(year, month)
    }
}

// ============================================================================
// Role
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Master,
    Slave,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Master, Role::Slave];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Master => "master",
            Role::Slave => "slave",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.trim().to_ascii_lowercase().as_str() {
            "master" => Ok(Role::Master),
            "slave" => Ok(Role::Slave),
            other => Err(format!("unknown role '{}' (expected master or slave)", other)),
        }
    }
}

// ============================================================================
// Derived identifiers
// ============================================================================

/// Ports owned by one month's replication pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortAssignment {
    pub master_port: u16,
    pub slave_port: u16,
}

impl PortAssignment {
    pub fn port(&self, role: Role) -> u16 {
        match role {
            Role::Master => self.master_port,
            Role::Slave => self.slave_port,
        }
    }
}

/// Location of a shard's database file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataFileRef(PathBuf);

impl DataFileRef {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for DataFileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// A supervised launch unit: the job name handed to the supervisor and the
/// file its definition lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LaunchUnitRef {
    name: String,
    path: PathBuf,
}

impl LaunchUnitRef {
    pub(crate) fn new(name: String, path: PathBuf) -> Self {
        Self { name, path }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for LaunchUnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_date_truncates_to_month() {
        let key = ShardKey::from_date(NaiveDate::from_ymd_opt(2012, 2, 29).unwrap()).unwrap();
        assert_eq!(key, ShardKey::new(2012, 2).unwrap());
        assert_eq!(key.first_day(), NaiveDate::from_ymd_opt(2012, 2, 1).unwrap());
    }

    #[test]
    fn test_shift_rolls_over_years() {
        let key = ShardKey::new(2012, 2).unwrap();
        assert_eq!(key.shift(-2).unwrap(), ShardKey::new(2011, 12).unwrap());
        assert_eq!(key.shift(11).unwrap(), ShardKey::new(2013, 1).unwrap());
        assert_eq!(key.shift(-26).unwrap(), ShardKey::new(2009, 12).unwrap());
        assert_eq!(key.shift(0).unwrap(), key);
    }

    #[test]
    fn test_shift_out_of_range() {
        let key = ShardKey::new(9999, 12).unwrap();
        assert!(matches!(key.shift(1), Err(ManagerError::InvalidShardKey(_))));

        let key = ShardKey::new(1, 1).unwrap();
        assert!(key.shift(-1).is_err());
        assert!(key.shift(i32::MIN).is_err());
    }

    #[test]
    fn test_invalid_fields() {
        assert!(ShardKey::new(2012, 0).is_err());
        assert!(ShardKey::new(2012, 13).is_err());
        assert!(ShardKey::new(0, 5).is_err());
        assert!(ShardKey::new(10000, 5).is_err());
    }

    #[test]
    fn test_stamp_and_display() {
        let key = ShardKey::new(2012, 2).unwrap();
        assert_eq!(key.stamp(), "201202");
        assert_eq!(key.to_string(), "2012-02");
    }

    #[test]
    fn test_parse_formats() {
        let expected = ShardKey::new(2011, 12).unwrap();
        assert_eq!("2011-12".parse::<ShardKey>().unwrap(), expected);
        assert_eq!("201112".parse::<ShardKey>().unwrap(), expected);
        assert_eq!("2011-12-25".parse::<ShardKey>().unwrap(), expected);
        assert!("2011/12".parse::<ShardKey>().is_err());
        assert!("2011-13".parse::<ShardKey>().is_err());
        assert!("december".parse::<ShardKey>().is_err());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("master".parse::<Role>().unwrap(), Role::Master);
        assert_eq!("Slave".parse::<Role>().unwrap(), Role::Slave);
        assert!("replica".parse::<Role>().is_err());
    }

    #[test]
    fn test_port_for_role() {
        let ports = PortAssignment {
            master_port: 10503,
            slave_port: 12503,
        };
        assert_eq!(ports.port(Role::Master), 10503);
        assert_eq!(ports.port(Role::Slave), 12503);
    }
}
