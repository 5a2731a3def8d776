use super::handle::Handle;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Color {
    Red,
    Black,
}

/// Which child slot of a parent a node occupies.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Side {
    Left = 0,
    Right = 1,
}

impl Side {
    #[inline]
    pub(crate) const fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

// Topology of one node. Kept apart from the keys so the sentinel can own a real slot
// without needing a key.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Links {
    color: Color,
    parent: Handle,
    children: [Handle; 2],
}

impl Links {
    /// Links of the sentinel: black, pointing nowhere.
    pub(crate) const SENTINEL: Self = Self {
        color: Color::Black,
        parent: Handle::NIL,
        children: [Handle::NIL, Handle::NIL],
    };

    /// Links of a freshly inserted node.
    pub(crate) const fn leaf(parent: Handle) -> Self {
        Self {
            color: Color::Red,
            parent,
            children: [Handle::NIL, Handle::NIL],
        }
    }

    #[inline]
    pub(crate) const fn color(&self) -> Color {
        self.color
    }

    #[inline]
    pub(crate) fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    #[inline]
    pub(crate) const fn parent(&self) -> Handle {
        self.parent
    }

    #[inline]
    pub(crate) fn set_parent(&mut self, parent: Handle) {
        self.parent = parent;
    }

    #[inline]
    pub(crate) const fn child(&self, side: Side) -> Handle {
        self.children[side as usize]
    }

    #[inline]
    pub(crate) fn set_child(&mut self, side: Side, child: Handle) {
        self.children[side as usize] = child;
    }

    /// Which side `child` hangs on. Anything that is not the left child counts as right.
    #[inline]
    pub(crate) fn side_of(&self, child: Handle) -> Side {
        if self.children[Side::Left as usize] == child { Side::Left } else { Side::Right }
    }
}
