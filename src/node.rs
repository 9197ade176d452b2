use crate::Address;

/// State shared by every station on the network
///
/// The configuration of a node (address and connection sizes) can only be changed while the
/// node is not active.  Changes requested while active are silently ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    active: bool,
    address: Address,
    consumed_size: u8,
    produced_size: u8,
}

impl Node {
    pub fn new(address: Address, consumed_size: u8, produced_size: u8) -> Self {
        let mut node = Self::default();
        node.set_address(address);
        node.consumed_size = consumed_size;
        node.produced_size = produced_size;
        node
    }

    #[inline(always)]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline(always)]
    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// MAC ID of this node.
    #[inline(always)]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Change the MAC ID.  Addresses outside `0..64` are ignored.
    pub fn set_address(&mut self, address: Address) {
        if !self.active && usize::from(address) < crate::MAX_DEVICES {
            self.address = address;
        }
    }

    /// Number of bytes the master consumes from this node (its input data).
    #[inline(always)]
    pub fn consumed_size(&self) -> u8 {
        self.consumed_size
    }

    pub fn set_consumed_size(&mut self, size: u8) {
        if !self.active {
            self.consumed_size = size;
        }
    }

    /// Number of bytes the master produces for this node (its output data).
    #[inline(always)]
    pub fn produced_size(&self) -> u8 {
        self.produced_size
    }

    pub fn set_produced_size(&mut self, size: u8) {
        if !self.active {
            self.produced_size = size;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_ignored_while_active() {
        let mut node = Node::new(5, 2, 4);
        node.set_active(true);

        node.set_address(9);
        node.set_consumed_size(10);
        node.set_produced_size(11);

        assert_eq!(node.address(), 5);
        assert_eq!(node.consumed_size(), 2);
        assert_eq!(node.produced_size(), 4);

        node.set_active(false);
        node.set_address(9);
        node.set_consumed_size(10);
        node.set_produced_size(11);

        assert_eq!(node.address(), 9);
        assert_eq!(node.consumed_size(), 10);
        assert_eq!(node.produced_size(), 11);
    }

    #[rstest::rstest]
    fn address_range(#[values(64, 65, 127, 255)] invalid: u8) {
        let mut node = Node::new(12, 0, 0);
        node.set_address(invalid);
        assert_eq!(node.address(), 12);

        let node = Node::new(invalid, 0, 0);
        assert_eq!(node.address(), 0);
    }

    proptest::proptest! {
        #[test]
        fn valid_addresses_accepted(address in 0u8..64) {
            let mut node = Node::default();
            node.set_address(address);
            proptest::prop_assert_eq!(node.address(), address);
        }
    }
}
