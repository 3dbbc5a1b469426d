//! Batches of binary spin configurations.

use crate::error::{Result, VmcError};

/// Largest site count accepted by [`SpinConfigs::enumerate`].
pub const MAX_ENUMERATED_SITES: usize = 20;

/// `batch` configurations of `num_sites` occupation numbers (0 = ground, 1 = Rydberg),
/// stored one configuration after another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinConfigs {
    num_sites: usize,
    data: Vec<u8>,
}

impl SpinConfigs {
    pub fn zeros(num_sites: usize, batch: usize) -> Self {
        Self { num_sites, data: vec![0; num_sites * batch] }
    }

    /// Build from row vectors, one per configuration.
    pub fn from_rows(num_sites: usize, rows: &[Vec<u8>]) -> Result<Self> {
        let mut data = Vec::with_capacity(num_sites * rows.len());
        for row in rows {
            if row.len() != num_sites {
                return Err(VmcError::ShapeMismatch {
                    what: "configuration length",
                    expected: num_sites,
                    found: row.len(),
                });
            }
            if let Some(&bad) = row.iter().find(|&&s| s > 1) {
                return Err(VmcError::InvalidConfiguration(format!(
                    "spin values must be 0 or 1, got {}",
                    bad
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self { num_sites, data })
    }

    /// Every configuration of `num_sites` spins, in binary counting order
    /// with site 0 as the most significant bit.
    pub fn enumerate(num_sites: usize) -> Result<Self> {
        if num_sites == 0 || num_sites > MAX_ENUMERATED_SITES {
            return Err(VmcError::InvalidConfiguration(format!(
                "cannot enumerate {} sites (limit {})",
                num_sites, MAX_ENUMERATED_SITES
            )));
        }
        let count = 1usize << num_sites;
        let mut configs = Self::zeros(num_sites, count);
        for b in 0..count {
            for (j, s) in configs.config_mut(b).iter_mut().enumerate() {
                *s = ((b >> (num_sites - 1 - j)) & 1) as u8;
            }
        }
        Ok(configs)
    }

    pub fn num_sites(&self) -> usize {
        self.num_sites
    }

    pub fn batch_size(&self) -> usize {
        if self.num_sites == 0 {
            0
        } else {
            self.data.len() / self.num_sites
        }
    }

    pub fn config(&self, b: usize) -> &[u8] {
        &self.data[b * self.num_sites..(b + 1) * self.num_sites]
    }

    /// Raw access for code that upholds the 0/1 invariant itself.
    pub(crate) fn config_mut(&mut self, b: usize) -> &mut [u8] {
        let n = self.num_sites;
        &mut self.data[b * n..(b + 1) * n]
    }

    pub fn get(&self, b: usize, site: usize) -> u8 {
        self.data[b * self.num_sites + site]
    }

    pub fn set(&mut self, b: usize, site: usize, value: u8) -> Result<()> {
        if value > 1 {
            return Err(VmcError::InvalidConfiguration(format!(
                "spin values must be 0 or 1, got {}",
                value
            )));
        }
        self.data[b * self.num_sites + site] = value;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.num_sites.max(1))
    }

    /// Copy of the batch with `site` complemented in every configuration.
    pub fn flipped(&self, site: usize) -> Self {
        let mut out = self.clone();
        for config in out.data.chunks_exact_mut(self.num_sites.max(1)) {
            config[site] ^= 1;
        }
        out
    }

    /// Number of excited sites in configuration `b`.
    pub fn occupation(&self, b: usize) -> usize {
        self.config(b).iter().map(|&s| s as usize).sum()
    }

    /// Fail with `ShapeMismatch` unless configurations have `num_sites` entries,
    /// or with `InvalidConfiguration` if any entry is not 0 or 1.
    pub fn check_sites(&self, num_sites: usize) -> Result<()> {
        if self.num_sites != num_sites {
            return Err(VmcError::ShapeMismatch {
                what: "configuration length",
                expected: num_sites,
                found: self.num_sites,
            });
        }
        if let Some(&bad) = self.data.iter().find(|&&s| s > 1) {
            return Err(VmcError::InvalidConfiguration(format!(
                "spin values must be 0 or 1, got {}",
                bad
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumerate_order() {
        let all = SpinConfigs::enumerate(3).unwrap();
        assert_eq!(all.batch_size(), 8);
        assert_eq!(all.config(0), &[0, 0, 0]);
        assert_eq!(all.config(1), &[0, 0, 1]);
        assert_eq!(all.config(6), &[1, 1, 0]);
        assert_eq!(all.occupation(7), 3);
    }

    #[test]
    fn test_double_flip_is_identity() {
        let configs = SpinConfigs::from_rows(4, &[vec![1, 0, 0, 1], vec![0, 1, 1, 0]]).unwrap();
        let once = configs.flipped(2);
        assert_eq!(once.config(0), &[1, 0, 1, 1]);
        assert_eq!(once.config(1), &[0, 1, 0, 0]);
        assert_eq!(once.flipped(2), configs);
    }

    #[test]
    fn test_from_rows_rejects_bad_input() {
        assert!(matches!(
            SpinConfigs::from_rows(3, &[vec![0, 1]]),
            Err(VmcError::ShapeMismatch { expected: 3, found: 2, .. })
        ));
        assert!(matches!(
            SpinConfigs::from_rows(2, &[vec![0, 2]]),
            Err(VmcError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_set_rejects_non_binary_values() {
        let mut configs = SpinConfigs::zeros(4, 1);
        assert!(configs.set(0, 1, 1).is_ok());
        assert!(matches!(configs.set(0, 1, 2), Err(VmcError::InvalidConfiguration(_))));
        assert_eq!(configs.config(0), &[0, 1, 0, 0]);
    }

    #[test]
    fn test_check_sites_rejects_non_binary_entries() {
        let mut configs = SpinConfigs::zeros(4, 2);
        assert!(configs.check_sites(4).is_ok());
        configs.config_mut(1)[2] = 3;
        assert!(matches!(configs.check_sites(4), Err(VmcError::InvalidConfiguration(_))));
        assert!(matches!(configs.check_sites(5), Err(VmcError::ShapeMismatch { .. })));
    }
}
