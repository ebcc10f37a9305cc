//! The value held by a port.

use crate::data::constants::Constants;
use crate::data::subset::SubsetPackage;

/// Kind of package a port carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageKind {
    Subset,
    Constants,
}

impl std::fmt::Display for PackageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageKind::Subset => write!(f, "subset"),
            PackageKind::Constants => write!(f, "constants"),
        }
    }
}

/// Data flowing along an edge.
#[derive(Debug, Clone, PartialEq)]
pub enum Package {
    Subset(SubsetPackage),
    Constants(Constants),
}

impl Package {
    /// An empty package of the given kind.
    pub fn empty(kind: PackageKind) -> Self {
        match kind {
            PackageKind::Subset => Package::Subset(SubsetPackage::new()),
            PackageKind::Constants => Package::Constants(Constants::new()),
        }
    }

    pub fn kind(&self) -> PackageKind {
        match self {
            Package::Subset(_) => PackageKind::Subset,
            Package::Constants(_) => PackageKind::Constants,
        }
    }

    pub fn as_subset(&self) -> Option<&SubsetPackage> {
        match self {
            Package::Subset(pack) => Some(pack),
            Package::Constants(_) => None,
        }
    }

    pub fn as_constants(&self) -> Option<&Constants> {
        match self {
            Package::Constants(constants) => Some(constants),
            Package::Subset(_) => None,
        }
    }

    /// Number of items or constant elements.
    pub fn count(&self) -> usize {
        match self {
            Package::Subset(pack) => pack.num_items(),
            Package::Constants(constants) => constants.count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

impl From<SubsetPackage> for Package {
    fn from(pack: SubsetPackage) -> Self {
        Package::Subset(pack)
    }
}

impl From<Constants> for Package {
    fn from(constants: Constants) -> Self {
        Package::Constants(constants)
    }
}
