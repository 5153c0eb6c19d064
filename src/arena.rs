//! Flat tree storage. Nodes live in a `Vec`; a [`Node`] is a `Copy` index
//! into it, and parent/child/sibling links are indices too, so the open-block
//! tree can carry parent back-references without reference counting.

use crate::nodes::Ast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node(pub usize);

struct Entry {
    ast: Ast,
    parent: Option<Node>,
    first_child: Option<Node>,
    last_child: Option<Node>,
    prev_sibling: Option<Node>,
    next_sibling: Option<Node>,
}

pub struct Arena {
    entries: Vec<Entry>,
}

impl Arena {
    pub fn new() -> Self {
        Arena {
            entries: Vec::new(),
        }
    }

    pub fn alloc(&mut self, ast: Ast) -> Node {
        let ix = self.entries.len();
        self.entries.push(Entry {
            ast,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        });
        Node(ix)
    }
}

impl Default for Arena {
    fn default() -> Self {
        Arena::new()
    }
}

impl Node {
    pub fn data<'a>(&self, arena: &'a Arena) -> &'a Ast {
        &arena.entries[self.0].ast
    }

    pub fn data_mut<'a>(&self, arena: &'a mut Arena) -> &'a mut Ast {
        &mut arena.entries[self.0].ast
    }

    pub fn parent(&self, arena: &Arena) -> Option<Node> {
        arena.entries[self.0].parent
    }

    pub fn first_child(&self, arena: &Arena) -> Option<Node> {
        arena.entries[self.0].first_child
    }

    pub fn last_child(&self, arena: &Arena) -> Option<Node> {
        arena.entries[self.0].last_child
    }

    pub fn previous_sibling(&self, arena: &Arena) -> Option<Node> {
        arena.entries[self.0].prev_sibling
    }

    pub fn next_sibling(&self, arena: &Arena) -> Option<Node> {
        arena.entries[self.0].next_sibling
    }

    pub fn last_child_is_open(&self, arena: &Arena) -> bool {
        self.last_child(arena).map_or(false, |n| n.data(arena).open)
    }

    /// Unlink this node (and its subtree) from its parent and siblings.
    pub fn detach(&self, arena: &mut Arena) {
        let (parent, prev, next) = {
            let e = &arena.entries[self.0];
            (e.parent, e.prev_sibling, e.next_sibling)
        };

        match prev {
            Some(p) => arena.entries[p.0].next_sibling = next,
            None => {
                if let Some(par) = parent {
                    arena.entries[par.0].first_child = next;
                }
            }
        }
        match next {
            Some(n) => arena.entries[n.0].prev_sibling = prev,
            None => {
                if let Some(par) = parent {
                    arena.entries[par.0].last_child = prev;
                }
            }
        }

        let e = &mut arena.entries[self.0];
        e.parent = None;
        e.prev_sibling = None;
        e.next_sibling = None;
    }

    pub fn append(&self, arena: &mut Arena, child: Node) {
        child.detach(arena);
        let old_last = arena.entries[self.0].last_child;
        arena.entries[child.0].parent = Some(*self);
        arena.entries[child.0].prev_sibling = old_last;
        match old_last {
            Some(l) => arena.entries[l.0].next_sibling = Some(child),
            None => arena.entries[self.0].first_child = Some(child),
        }
        arena.entries[self.0].last_child = Some(child);
    }

    pub fn insert_after(&self, arena: &mut Arena, sibling: Node) {
        sibling.detach(arena);
        let (parent, next) = {
            let e = &arena.entries[self.0];
            (e.parent, e.next_sibling)
        };
        arena.entries[sibling.0].parent = parent;
        arena.entries[sibling.0].prev_sibling = Some(*self);
        arena.entries[sibling.0].next_sibling = next;
        arena.entries[self.0].next_sibling = Some(sibling);
        match next {
            Some(n) => arena.entries[n.0].prev_sibling = Some(sibling),
            None => {
                if let Some(par) = parent {
                    arena.entries[par.0].last_child = Some(sibling);
                }
            }
        }
    }

    pub fn insert_before(&self, arena: &mut Arena, sibling: Node) {
        sibling.detach(arena);
        let (parent, prev) = {
            let e = &arena.entries[self.0];
            (e.parent, e.prev_sibling)
        };
        arena.entries[sibling.0].parent = parent;
        arena.entries[sibling.0].next_sibling = Some(*self);
        arena.entries[sibling.0].prev_sibling = prev;
        arena.entries[self.0].prev_sibling = Some(sibling);
        match prev {
            Some(p) => arena.entries[p.0].next_sibling = Some(sibling),
            None => {
                if let Some(par) = parent {
                    arena.entries[par.0].first_child = Some(sibling);
                }
            }
        }
    }

    /// Collect the current children. Snapshotting keeps callers free to
    /// mutate the arena while they walk.
    pub fn children(&self, arena: &Arena) -> Vec<Node> {
        let mut out = Vec::new();
        let mut it = self.first_child(arena);
        while let Some(n) = it {
            out.push(n);
            it = n.next_sibling(arena);
        }
        out
    }
}
