use relayd_hooks::EventBus;

/// Implemented by every host object type that carries a per-object
/// extension area.
pub trait MdextHost {
    fn ext_area(&mut self) -> &mut Vec<u8>;
}

/// One reserved slice of a [`MdextHeader`]'s extension area. Identified by
/// a stable `id` rather than its position in `items`, since removing an
/// earlier item shifts everyone after it.
#[derive(Copy, Clone, Debug)]
struct MdextItem {
    id: u64,
    offset: usize,
    size: usize,
}

/// Handle to a reserved item, returned by [`MdextHeader::create_item`] and
/// consumed by [`MdextHeader::remove_item`]. Its live offset can shift as
/// earlier items are added/removed; re-read it via
/// [`MdextHeader::item_offset`] rather than caching one.
#[derive(Copy, Clone, Debug)]
pub struct ExtItemHandle {
    id: u64,
    pub size: usize,
}

/// Descriptor for one host type's extension area. Owns the offset/size layout;
/// resizing live instances is the caller's job because the header has no
/// way to enumerate them itself — callers pass an iterator over whatever
/// arena holds the host objects.
pub struct MdextHeader {
    name: String,
    size: usize,
    items: Vec<MdextItem>,
    next_id: u64,
}

impl MdextHeader {
    pub fn new(name: impl Into<String>) -> Self {
        MdextHeader {
            name: name.into(),
            size: 0,
            items: Vec::new(),
            next_id: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current total extension area size; every live instance's `ext_area`
    /// must equal this after any `create_item`/`remove_item` call completes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn item_offset(&self, handle: &ExtItemHandle) -> usize {
        self.items
            .iter()
            .find(|i| i.id == handle.id)
            .map(|i| i.offset)
            .expect("handle from a different header or already removed")
    }

    /// Reserves `size` new bytes at the end of the area and grows every
    /// live instance to match, zero-filling the new suffix.
    pub fn create_item<'a, H>(
        &mut self,
        size: usize,
        instances: impl IntoIterator<Item = &'a mut H>,
    ) -> ExtItemHandle
    where
        H: MdextHost + 'a,
    {
        let offset = self.size;
        let id = self.next_id;
        self.next_id += 1;
        self.items.push(MdextItem { id, offset, size });
        self.size += size;
        for inst in instances {
            inst.ext_area().resize(self.size, 0);
        }
        ExtItemHandle { id, size }
    }

    /// Reverses [`create_item`]: shifts bytes of later items down over the
    /// removed slice, shrinks every live instance, and renumbers the
    /// offsets of items that came after it.
    pub fn remove_item<'a, H>(
        &mut self,
        handle: ExtItemHandle,
        instances: impl IntoIterator<Item = &'a mut H>,
    ) where
        H: MdextHost + 'a,
    {
        let pos = self
            .items
            .iter()
            .position(|i| i.id == handle.id)
            .expect("handle from a different header or already removed");
        let removed = self.items.remove(pos);
        for item in self.items.iter_mut().skip(pos) {
            item.offset -= removed.size;
        }
        self.size -= removed.size;
        for inst in instances {
            let area = inst.ext_area();
            area.drain(removed.offset..removed.offset + removed.size);
        }
    }

    /// Allocates a new instance's extension area at the header's current
    /// size and fires the header's `<name>_mdext_create` event.
    pub fn alloc_instance<H: MdextHost>(&self, host: &mut H, bus: &mut EventBus) {
        host.ext_area().resize(self.size, 0);
        let event = format!("{}_mdext_create", self.name);
        if bus.get(&event).is_some() {
            let _ = bus.fire(&event, &());
        }
    }

    /// Fires the header's `<name>_mdext_destroy` event just before an
    /// instance is dropped, so modules can release anything they stashed
    /// in its extension area.
    pub fn free_instance(&self, bus: &mut EventBus) {
        let event = format!("{}_mdext_destroy", self.name);
        if bus.get(&event).is_some() {
            let _ = bus.fire(&event, &());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Client {
        ext: Vec<u8>,
    }

    impl MdextHost for Client {
        fn ext_area(&mut self) -> &mut Vec<u8> {
            &mut self.ext
        }
    }

    #[test]
    fn resize_preserves_earlier_items_and_zero_fills_new_ones() {
        // Client header starts at size 0. M1 reserves 8 bytes, M2
        // reserves 16; unloading M1 shrinks back to 16 with M2 at offset 0.
        let mut header = MdextHeader::new("client");
        let mut clients = vec![Client { ext: Vec::new() }, Client { ext: Vec::new() }];

        let m1 = header.create_item(8, clients.iter_mut());
        assert_eq!(header.size(), 8);
        for c in &clients {
            assert_eq!(c.ext.len(), 8);
            assert!(c.ext.iter().all(|&b| b == 0));
        }

        for c in &mut clients {
            c.ext[0] = 0xAB;
        }

        let m2 = header.create_item(16, clients.iter_mut());
        assert_eq!(header.size(), 24);
        for c in &clients {
            assert_eq!(c.ext.len(), 24);
            assert_eq!(c.ext[0], 0xAB, "M1's data at [0,8) must survive the resize");
            assert!(c.ext[8..24].iter().all(|&b| b == 0));
        }
        assert_eq!(header.item_offset(&m2), 8);

        header.remove_item(m1, clients.iter_mut());
        assert_eq!(header.size(), 16);
        for c in &clients {
            assert_eq!(c.ext.len(), 16);
        }
        assert_eq!(header.item_offset(&m2), 0);
    }
}
