//! Runtime classification of interfaces and devices
//!
//! Every object of the model carries a [`Kind`].  Kinds form a single-inheritance chain
//! (`CifInterface` → `Interface` → `Node` → `Identificator`) and [`Kind::is_kind()`] walks that
//! chain.  Backends use this before downcasting a `dyn Interface` to their concrete type.

/// Classification of an object in the DeviceNet model
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum Kind {
    Identificator,
    Node,
    Interface,
    Device,
    CifDevice,
    NiDevice,
    NiInterface,
    CifInterface,
}

const ALL_KINDS: [Kind; 8] = [
    Kind::Identificator,
    Kind::Node,
    Kind::Interface,
    Kind::Device,
    Kind::CifDevice,
    Kind::NiDevice,
    Kind::NiInterface,
    Kind::CifInterface,
];

impl Kind {
    /// Numeric class identifier
    pub fn class_id(self) -> u32 {
        match self {
            Kind::Identificator => 101,
            Kind::Node => 201,
            Kind::Interface => 301,
            Kind::Device => 351,
            Kind::CifDevice => 352,
            Kind::NiDevice => 353,
            Kind::NiInterface => 401,
            Kind::CifInterface => 402,
        }
    }

    /// Class name
    pub fn name(self) -> &'static str {
        match self {
            Kind::Identificator => "CIdentificator",
            Kind::Node => "CNode",
            Kind::Interface => "CInterface",
            Kind::Device => "CDevice",
            Kind::CifDevice => "CCIFDevice",
            Kind::NiDevice => "CNIDevice",
            Kind::NiInterface => "CNIInterface",
            Kind::CifInterface => "CCIFInterface",
        }
    }

    /// Direct ancestor, `None` for the root of the chain.
    pub fn parent(self) -> Option<Kind> {
        match self {
            Kind::Identificator => None,
            Kind::Node => Some(Kind::Identificator),
            Kind::Interface | Kind::Device => Some(Kind::Node),
            Kind::NiInterface | Kind::CifInterface => Some(Kind::Interface),
            Kind::NiDevice | Kind::CifDevice => Some(Kind::Device),
        }
    }

    pub fn from_class_id(id: u32) -> Option<Kind> {
        ALL_KINDS.iter().copied().find(|k| k.class_id() == id)
    }

    pub fn from_name(name: &str) -> Option<Kind> {
        ALL_KINDS.iter().copied().find(|k| k.name() == name)
    }

    /// Iterate over this kind and all of its ancestors, most specific first.
    pub fn ancestors(self) -> impl Iterator<Item = Kind> {
        core::iter::successors(Some(self), |k| k.parent())
    }

    /// Whether an object of this kind is also an `other`.
    pub fn is_kind(self, other: Kind) -> bool {
        self.ancestors().any(|k| k == other)
    }
}

impl core::fmt::Display for Kind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Objects that carry a runtime [`Kind`]
pub trait Classified {
    fn kind(&self) -> Kind;

    #[inline(always)]
    fn class_id(&self) -> u32 {
        self.kind().class_id()
    }

    #[inline(always)]
    fn class_name(&self) -> &'static str {
        self.kind().name()
    }

    fn is_kind(&self, kind: Kind) -> bool {
        self.kind().is_kind(kind)
    }

    fn is_kind_id(&self, class_id: u32) -> bool {
        self.kind().ancestors().any(|k| k.class_id() == class_id)
    }

    fn is_kind_named(&self, name: &str) -> bool {
        self.kind().ancestors().any(|k| k.name() == name)
    }
}
