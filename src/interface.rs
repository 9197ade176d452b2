//! The master's own connection to the network
use std::any::Any;
use std::cell::{RefCell, RefMut};
use std::rc::{Rc, Weak};

use crate::{Baudrate, Classified, Kind, Node};

/// Shared handle to an interface, as held by the application
pub type InterfaceRef = Rc<RefCell<dyn Interface>>;

/// Non-owning handle to an interface, as held by devices
pub type WeakInterfaceRef = Weak<RefCell<dyn Interface>>;

/// Node state plus baudrate, common to all interface backends
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InterfaceBase {
    pub(crate) node: Node,
    baudrate: Baudrate,
}

impl InterfaceBase {
    pub fn new(address: crate::Address, baudrate: Baudrate) -> Self {
        Self {
            node: Node::new(address, 0, 0),
            baudrate,
        }
    }

    #[inline(always)]
    pub fn node(&self) -> &Node {
        &self.node
    }

    #[inline(always)]
    pub fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }

    #[inline(always)]
    pub fn baudrate(&self) -> Baudrate {
        self.baudrate
    }

    /// Change the baudrate.  Ignored while the interface is open.
    pub fn set_baudrate(&mut self, baudrate: Baudrate) {
        if !self.node.is_active() {
            self.baudrate = baudrate;
        }
    }
}

/// A master interface to the DeviceNet network
///
/// `open()`, `close()`, and `reset()` are idempotent: opening an open interface refreshes its
/// configuration, closing a closed one does nothing.
pub trait Interface: Classified + Any {
    fn base(&self) -> &InterfaceBase;
    fn base_mut(&mut self) -> &mut InterfaceBase;

    /// Bring the interface online.
    fn open(&mut self) -> crate::Result<()>;

    /// Take the interface offline.
    fn close(&mut self) -> crate::Result<()>;

    /// Reset the interface hardware.
    ///
    /// The meaning of `mode` is backend specific.
    fn reset(&mut self, mode: u16) -> crate::Result<()>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    #[inline(always)]
    fn is_active(&self) -> bool {
        self.base().node().is_active()
    }

    #[inline(always)]
    fn address(&self) -> crate::Address {
        self.base().node().address()
    }

    #[inline(always)]
    fn baudrate(&self) -> Baudrate {
        self.base().baudrate()
    }
}

/// Borrow the interface behind a device's handle.
///
/// Fails with [`crate::Error::InvalidPointer`] when the interface is gone or already borrowed.
pub(crate) fn borrow(
    strong: &Option<InterfaceRef>,
    device: crate::Address,
) -> crate::Result<RefMut<'_, dyn Interface>> {
    strong
        .as_ref()
        .and_then(|cell| cell.try_borrow_mut().ok())
        .ok_or(crate::Error::InvalidPointer {
            device,
            name: "interface",
        })
}

/// Narrow a borrowed interface down to the concrete backend type of kind `expected`.
pub(crate) fn downcast<T: Interface>(
    intf: RefMut<'_, dyn Interface>,
    device: crate::Address,
    expected: Kind,
) -> crate::Result<RefMut<'_, T>> {
    if !intf.is_kind(expected) {
        return Err(crate::Error::InvalidInterface { device, expected });
    }
    RefMut::filter_map(intf, |i| i.as_any_mut().downcast_mut::<T>())
        .map_err(|_| crate::Error::InvalidInterface { device, expected })
}

/// Fail with [`crate::Error::NotOperational`] unless the interface is open.
pub(crate) fn require_open(intf: &dyn Interface, function: &'static str) -> crate::Result<()> {
    if intf.is_active() {
        Ok(())
    } else {
        Err(crate::Error::NotOperational(function))
    }
}
