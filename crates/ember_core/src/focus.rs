//! Focus tree
//!
//! Tracks which leaf [`FocusNodeId`] owns keyboard input.
//!
//! Scopes form a tree rooted at the manager's root scope. Each scope keeps its
//! children in a doubly-linked sibling list and owns at most one focus node.
//! The *active chain* is found by following first-child links from the root;
//! the deepest scope on that chain decides the current focus. Making a scope
//! its parent's first child (`set_first_focus`) is how switching tabs or
//! routes moves focus between subtrees.
//!
//! All nodes live in arenas owned by the manager, so parent/child/sibling
//! relationships are plain ids and disposal can never leave a dangling owner.
//!
//! Recomputing the current focus is deferred: any mutation of the active chain
//! schedules a single microtask, however many mutations happen before it runs.
//! When it runs, the node that lost focus is notified first, then the node that
//! gained it. A net "no change" notifies nobody.
//!
//! ```ignore
//! let manager = FocusManager::new(scheduler.handle());
//! let field = manager.create_node(Some("email"));
//! manager.request_focus(manager.root_scope(), field)?;
//!
//! scheduler.flush_microtasks();
//! assert!(manager.has_focus(field));
//! ```

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{CoreError, Result};
use crate::scheduler::SchedulerHandle;

new_key_type! {
    /// Identifier of an interior scope in the focus tree
    pub struct FocusScopeId;
    /// Identifier of a focusable leaf
    pub struct FocusNodeId;
}

/// Callback fired when a node gains (`true`) or loses (`false`) focus
pub type FocusListener = Rc<dyn Fn(FocusNodeId, bool)>;

/// Handle for removing a focus listener
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FocusListenerId(u64);

#[derive(Default)]
struct ScopeData {
    parent: Option<FocusScopeId>,
    prev_sibling: Option<FocusScopeId>,
    next_sibling: Option<FocusScopeId>,
    first_child: Option<FocusScopeId>,
    last_child: Option<FocusScopeId>,
    focus: Option<FocusNodeId>,
    debug_label: Option<String>,
}

#[derive(Default)]
struct NodeData {
    /// Owning scope; `None` while unfocused
    parent: Option<FocusScopeId>,
    has_keyboard_token: bool,
    listeners: SmallVec<[(FocusListenerId, FocusListener); 2]>,
    debug_label: Option<String>,
}

struct FocusTree {
    scopes: SlotMap<FocusScopeId, ScopeData>,
    nodes: SlotMap<FocusNodeId, NodeData>,
    root: FocusScopeId,
    current_focus: Option<FocusNodeId>,
    update_scheduled: bool,
    /// Set while listeners of a recomputation are running
    notifying: bool,
    update_count: u64,
    next_listener_id: u64,
}

impl FocusTree {
    fn new() -> Self {
        let mut scopes = SlotMap::with_key();
        let root = scopes.insert(ScopeData {
            debug_label: Some("root".to_string()),
            ..Default::default()
        });
        Self {
            scopes,
            nodes: SlotMap::with_key(),
            root,
            current_focus: None,
            update_scheduled: false,
            notifying: false,
            update_count: 0,
            next_listener_id: 0,
        }
    }

    fn scope(&self, id: FocusScopeId) -> Result<&ScopeData> {
        self.scopes
            .get(id)
            .ok_or_else(|| CoreError::UnknownScope(format!("{id:?}")))
    }

    fn node(&self, id: FocusNodeId) -> Result<&NodeData> {
        self.nodes
            .get(id)
            .ok_or_else(|| CoreError::UnknownNode(format!("{id:?}")))
    }

    fn parent_of(&self, id: FocusScopeId) -> Option<FocusScopeId> {
        self.scopes.get(id).and_then(|s| s.parent)
    }

    fn is_first_focus(&self, id: FocusScopeId) -> bool {
        match self.parent_of(id) {
            None => true,
            Some(parent) => self.scopes.get(parent).and_then(|p| p.first_child) == Some(id),
        }
    }

    /// True if `id` lies on the first-child chain that starts at the root
    fn is_on_active_chain(&self, id: FocusScopeId) -> bool {
        let mut scope = id;
        loop {
            match self.parent_of(scope) {
                None => return scope == self.root,
                Some(parent) => {
                    if self.scopes.get(parent).and_then(|p| p.first_child) != Some(scope) {
                        return false;
                    }
                    scope = parent;
                }
            }
        }
    }

    fn is_attached(&self, id: FocusScopeId) -> bool {
        let mut scope = id;
        while let Some(parent) = self.parent_of(scope) {
            scope = parent;
        }
        scope == self.root
    }

    /// True if `ancestor` is `id` or one of its ancestors
    fn is_self_or_ancestor(&self, ancestor: FocusScopeId, id: FocusScopeId) -> bool {
        let mut scope = Some(id);
        while let Some(s) = scope {
            if s == ancestor {
                return true;
            }
            scope = self.parent_of(s);
        }
        false
    }

    /// Returns true if the caller must schedule a recomputation
    fn did_change_focus_chain(&mut self, scope: FocusScopeId) -> bool {
        if !self.is_on_active_chain(scope) {
            return false;
        }
        if self.update_scheduled {
            return false;
        }
        self.update_scheduled = true;
        true
    }

    fn prepend(&mut self, parent: FocusScopeId, child: FocusScopeId) {
        let old_first = self.scopes.get(parent).and_then(|p| p.first_child);
        if let Some(c) = self.scopes.get_mut(child) {
            c.parent = Some(parent);
            c.prev_sibling = None;
            c.next_sibling = old_first;
        }
        if let Some(first) = old_first {
            if let Some(f) = self.scopes.get_mut(first) {
                f.prev_sibling = Some(child);
            }
        }
        if let Some(p) = self.scopes.get_mut(parent) {
            p.first_child = Some(child);
            if p.last_child.is_none() {
                p.last_child = Some(child);
            }
        }
    }

    fn remove_child(&mut self, parent: FocusScopeId, child: FocusScopeId) {
        let (prev, next) = match self.scopes.get(child) {
            Some(c) if c.parent == Some(parent) => (c.prev_sibling, c.next_sibling),
            _ => return,
        };

        match prev {
            None => {
                if let Some(p) = self.scopes.get_mut(parent) {
                    p.first_child = next;
                }
            }
            Some(prev) => {
                if let Some(s) = self.scopes.get_mut(prev) {
                    s.next_sibling = next;
                }
            }
        }
        match next {
            None => {
                if let Some(p) = self.scopes.get_mut(parent) {
                    p.last_child = prev;
                }
            }
            Some(next) => {
                if let Some(s) = self.scopes.get_mut(next) {
                    s.prev_sibling = prev;
                }
            }
        }

        if let Some(c) = self.scopes.get_mut(child) {
            c.parent = None;
            c.prev_sibling = None;
            c.next_sibling = None;
        }
    }

    fn detach(&mut self, scope: FocusScopeId) -> bool {
        if !self.scopes.contains_key(scope) {
            return false;
        }
        let schedule = self.did_change_focus_chain(scope);
        if let Some(parent) = self.parent_of(scope) {
            self.remove_child(parent, scope);
        }
        schedule
    }

    fn set_focus(&mut self, scope: FocusScopeId, node: FocusNodeId) -> bool {
        if let Some(s) = self.scopes.get_mut(scope) {
            s.focus = Some(node);
        }
        if let Some(n) = self.nodes.get_mut(node) {
            n.parent = Some(scope);
            n.has_keyboard_token = true;
        }
        self.did_change_focus_chain(scope)
    }

    fn resign_focus(&mut self, scope: FocusScopeId, node: FocusNodeId) -> bool {
        match self.scopes.get_mut(scope) {
            Some(s) if s.focus == Some(node) => s.focus = None,
            _ => return false,
        }
        if let Some(n) = self.nodes.get_mut(node) {
            n.parent = None;
        }
        self.did_change_focus_chain(scope)
    }

    fn unfocus(&mut self, node: FocusNodeId) -> bool {
        match self.nodes.get(node).and_then(|n| n.parent) {
            Some(parent) => self.resign_focus(parent, node),
            None => false,
        }
    }

    fn find_next_focus(&self) -> Option<FocusNodeId> {
        let mut scope = self.root;
        while let Some(child) = self.scopes.get(scope).and_then(|s| s.first_child) {
            scope = child;
        }
        self.scopes.get(scope).and_then(|s| s.focus)
    }

    fn listeners_of(&self, node: Option<FocusNodeId>) -> SmallVec<[FocusListener; 2]> {
        node.and_then(|id| self.nodes.get(id))
            .map(|n| n.listeners.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default()
    }

    fn node_label(&self, node: FocusNodeId) -> String {
        self.nodes
            .get(node)
            .and_then(|n| n.debug_label.clone())
            .unwrap_or_else(|| format!("{node:?}"))
    }

    fn label_of(&self, scope: FocusScopeId) -> String {
        self.scopes
            .get(scope)
            .and_then(|s| s.debug_label.clone())
            .unwrap_or_else(|| format!("{scope:?}"))
    }
}

/// Owner of the focus tree
///
/// Cloning yields another handle to the same tree.
#[derive(Clone)]
pub struct FocusManager {
    tree: Rc<RefCell<FocusTree>>,
    scheduler: SchedulerHandle,
}

impl FocusManager {
    pub fn new(scheduler: SchedulerHandle) -> Self {
        Self {
            tree: Rc::new(RefCell::new(FocusTree::new())),
            scheduler,
        }
    }

    pub fn root_scope(&self) -> FocusScopeId {
        self.tree.borrow().root
    }

    /// Create an unattached scope
    pub fn create_scope(&self, debug_label: Option<&str>) -> FocusScopeId {
        self.tree.borrow_mut().scopes.insert(ScopeData {
            debug_label: debug_label.map(str::to_string),
            ..Default::default()
        })
    }

    /// Create an unfocused node
    pub fn create_node(&self, debug_label: Option<&str>) -> FocusNodeId {
        self.tree.borrow_mut().nodes.insert(NodeData {
            debug_label: debug_label.map(str::to_string),
            ..Default::default()
        })
    }

    // =========================================================================
    // Node operations
    // =========================================================================

    /// Make `node` the focus of `scope`
    ///
    /// The scope's previous focus and the node's previous owner both give it up.
    /// The node receives a fresh keyboard token.
    pub fn request_focus(&self, scope: FocusScopeId, node: FocusNodeId) -> Result<()> {
        let schedule = {
            let mut tree = self.tree.borrow_mut();
            let current = tree.scope(scope)?.focus;
            tree.node(node)?;

            if current == Some(node) {
                if let Some(n) = tree.nodes.get_mut(node) {
                    n.has_keyboard_token = true;
                }
                return Ok(());
            }

            let mut schedule = false;
            if let Some(old) = current {
                schedule |= tree.resign_focus(scope, old);
            }
            schedule |= tree.unfocus(node);
            schedule |= tree.set_focus(scope, node);
            tracing::debug!(
                "request_focus: '{}' in scope '{}'",
                tree.node_label(node),
                tree.label_of(scope)
            );
            schedule
        };
        self.schedule_update_if(schedule);
        Ok(())
    }

    /// Like [`request_focus`](Self::request_focus) but only if `scope` has no focus yet
    pub fn autofocus(&self, scope: FocusScopeId, node: FocusNodeId) -> Result<()> {
        let schedule = {
            let mut tree = self.tree.borrow_mut();
            if tree.scope(scope)?.focus.is_some() {
                tree.node(node)?;
                return Ok(());
            }
            tree.node(node)?;
            let mut schedule = tree.unfocus(node);
            schedule |= tree.set_focus(scope, node);
            schedule
        };
        self.schedule_update_if(schedule);
        Ok(())
    }

    /// Move `node` into `scope` if it currently belongs to another scope
    pub fn reparent_if_needed(&self, scope: FocusScopeId, node: FocusNodeId) -> Result<()> {
        let schedule = {
            let mut tree = self.tree.borrow_mut();
            let scope_focus = tree.scope(scope)?.focus;
            match tree.node(node)?.parent {
                None => return Ok(()),
                Some(owner) if owner == scope => return Ok(()),
                Some(_) => {}
            }
            let mut schedule = tree.unfocus(node);
            if scope_focus.is_none() {
                schedule |= tree.set_focus(scope, node);
            }
            schedule
        };
        self.schedule_update_if(schedule);
        Ok(())
    }

    /// Give up focus; a no-op for unfocused or disposed nodes
    pub fn unfocus(&self, node: FocusNodeId) {
        let schedule = self.tree.borrow_mut().unfocus(node);
        self.schedule_update_if(schedule);
    }

    /// Unfocus and free the node; safe to call more than once
    ///
    /// Disposal clears the current-focus pointer without notifying the node.
    pub fn dispose_node(&self, node: FocusNodeId) {
        let (schedule, removed) = {
            let mut tree = self.tree.borrow_mut();
            if tree.current_focus == Some(node) {
                tree.current_focus = None;
            }
            let schedule = tree.unfocus(node);
            (schedule, tree.nodes.remove(node))
        };
        drop(removed);
        self.schedule_update_if(schedule);
    }

    /// Take the node's keyboard token; true at most once per focus request
    pub fn consume_keyboard_token(&self, node: FocusNodeId) -> bool {
        let mut tree = self.tree.borrow_mut();
        match tree.nodes.get_mut(node) {
            Some(n) if n.has_keyboard_token => {
                n.has_keyboard_token = false;
                true
            }
            _ => false,
        }
    }

    pub fn has_keyboard_token(&self, node: FocusNodeId) -> bool {
        self.tree
            .borrow()
            .nodes
            .get(node)
            .map(|n| n.has_keyboard_token)
            .unwrap_or(false)
    }

    /// Whether `node` is the manager's current focus as of the last recomputation
    pub fn has_focus(&self, node: FocusNodeId) -> bool {
        self.tree.borrow().current_focus == Some(node)
    }

    /// The scope that currently owns `node`
    pub fn owner_scope(&self, node: FocusNodeId) -> Option<FocusScopeId> {
        self.tree.borrow().nodes.get(node).and_then(|n| n.parent)
    }

    pub fn contains_node(&self, node: FocusNodeId) -> bool {
        self.tree.borrow().nodes.contains_key(node)
    }

    pub fn add_listener(&self, node: FocusNodeId, listener: FocusListener) -> Result<FocusListenerId> {
        let mut tree = self.tree.borrow_mut();
        tree.node(node)?;
        tree.next_listener_id += 1;
        let id = FocusListenerId(tree.next_listener_id);
        if let Some(n) = tree.nodes.get_mut(node) {
            n.listeners.push((id, listener));
        }
        Ok(id)
    }

    pub fn remove_listener(&self, node: FocusNodeId, id: FocusListenerId) -> bool {
        let mut tree = self.tree.borrow_mut();
        match tree.nodes.get_mut(node) {
            Some(n) => {
                let before = n.listeners.len();
                n.listeners.retain(|(lid, _)| *lid != id);
                n.listeners.len() != before
            }
            None => false,
        }
    }

    // =========================================================================
    // Scope operations
    // =========================================================================

    /// Make `child` the first child of `parent`, moving it from wherever it is
    ///
    /// Fails without touching the tree if `child` is `parent` or one of its
    /// ancestors.
    pub fn set_first_focus(&self, parent: FocusScopeId, child: FocusScopeId) -> Result<()> {
        let schedule = {
            let mut tree = self.tree.borrow_mut();
            let first = tree.scope(parent)?.first_child;
            tree.scope(child)?;
            if first == Some(child) {
                return Ok(());
            }
            if tree.is_self_or_ancestor(child, parent) {
                return Err(CoreError::FocusCycle {
                    parent: tree.label_of(parent),
                    child: tree.label_of(child),
                });
            }

            let mut schedule = tree.detach(child);
            tree.prepend(parent, child);
            schedule |= tree.did_change_focus_chain(parent);
            tracing::debug!(
                "set_first_focus: '{}' is now first under '{}'",
                tree.label_of(child),
                tree.label_of(parent)
            );
            schedule
        };
        self.schedule_update_if(schedule);
        Ok(())
    }

    /// Adopt `child` if it belongs to another parent
    ///
    /// A child that was first focus in its old parent becomes first focus here;
    /// otherwise it is only detached.
    pub fn reparent_scope_if_needed(&self, parent: FocusScopeId, child: FocusScopeId) -> Result<()> {
        let (old_parent, first) = {
            let tree = self.tree.borrow();
            tree.scope(parent)?;
            (tree.scope(child)?.parent, tree.is_first_focus(child))
        };
        match old_parent {
            None => Ok(()),
            Some(p) if p == parent => Ok(()),
            Some(_) if first => self.set_first_focus(parent, child),
            Some(_) => {
                self.detach_scope(child);
                Ok(())
            }
        }
    }

    /// Remove `scope` from its parent; safe on unattached or disposed scopes
    pub fn detach_scope(&self, scope: FocusScopeId) {
        let schedule = self.tree.borrow_mut().detach(scope);
        self.schedule_update_if(schedule);
    }

    /// Detach and free `scope`
    ///
    /// Child scopes are left unattached and the owned focus node is resigned.
    /// The root scope cannot be disposed.
    pub fn dispose_scope(&self, scope: FocusScopeId) {
        let (schedule, removed) = {
            let mut tree = self.tree.borrow_mut();
            if scope == tree.root {
                tracing::warn!("dispose_scope: ignoring attempt to dispose the root scope");
                return;
            }
            if !tree.scopes.contains_key(scope) {
                return;
            }

            let mut schedule = tree.detach(scope);
            let mut child = tree.scopes.get(scope).and_then(|s| s.first_child);
            while let Some(c) = child {
                child = tree.scopes.get(c).and_then(|s| s.next_sibling);
                tree.remove_child(scope, c);
            }
            if let Some(node) = tree.scopes.get(scope).and_then(|s| s.focus) {
                schedule |= tree.resign_focus(scope, node);
            }
            (schedule, tree.scopes.remove(scope))
        };
        drop(removed);
        self.schedule_update_if(schedule);
    }

    /// True if `scope` is its parent's first child, or has no parent
    pub fn is_first_focus(&self, scope: FocusScopeId) -> bool {
        self.tree.borrow().is_first_focus(scope)
    }

    /// True if `scope` is reachable from the root
    pub fn is_attached(&self, scope: FocusScopeId) -> bool {
        self.tree.borrow().is_attached(scope)
    }

    pub fn focused_child(&self, scope: FocusScopeId) -> Option<FocusNodeId> {
        self.tree.borrow().scopes.get(scope).and_then(|s| s.focus)
    }

    pub fn parent_scope(&self, scope: FocusScopeId) -> Option<FocusScopeId> {
        self.tree.borrow().parent_of(scope)
    }

    /// Child scopes in sibling order
    pub fn children(&self, scope: FocusScopeId) -> Vec<FocusScopeId> {
        let tree = self.tree.borrow();
        let mut out = Vec::new();
        let mut child = tree.scopes.get(scope).and_then(|s| s.first_child);
        while let Some(c) = child {
            out.push(c);
            child = tree.scopes.get(c).and_then(|s| s.next_sibling);
        }
        out
    }

    /// Scopes from `scope` up to its topmost ancestor
    pub fn focus_path(&self, scope: FocusScopeId) -> Vec<FocusScopeId> {
        let tree = self.tree.borrow();
        let mut path = Vec::new();
        let mut current = tree.scopes.contains_key(scope).then_some(scope);
        while let Some(s) = current {
            path.push(s);
            current = tree.parent_of(s);
        }
        path
    }

    pub fn contains_scope(&self, scope: FocusScopeId) -> bool {
        self.tree.borrow().scopes.contains_key(scope)
    }

    // =========================================================================
    // Recomputation
    // =========================================================================

    /// Current focus as of the last recomputation
    pub fn current_focus(&self) -> Option<FocusNodeId> {
        self.tree.borrow().current_focus
    }

    pub fn is_update_scheduled(&self) -> bool {
        self.tree.borrow().update_scheduled
    }

    /// Number of recomputations that changed the current focus
    pub fn update_count(&self) -> u64 {
        self.tree.borrow().update_count
    }

    /// Run a pending recomputation now instead of waiting for the microtask
    ///
    /// Does nothing while a recomputation is notifying listeners.
    pub fn flush_update(&self) {
        let pending = {
            let tree = self.tree.borrow();
            tree.update_scheduled && !tree.notifying
        };
        if pending {
            apply_update(&self.tree);
        }
    }

    fn schedule_update_if(&self, schedule: bool) {
        if !schedule {
            return;
        }
        let weak: Weak<RefCell<FocusTree>> = Rc::downgrade(&self.tree);
        let scheduled = self.scheduler.schedule_microtask(Box::new(move || {
            if let Some(tree) = weak.upgrade() {
                apply_update(&tree);
            }
        }));
        if let Err(err) = scheduled {
            tracing::warn!("focus update could not be scheduled: {}", err);
            self.tree.borrow_mut().update_scheduled = false;
        }
    }
}

fn apply_update(tree: &Rc<RefCell<FocusTree>>) {
    let (previous, next, lost, gained) = {
        let mut t = tree.borrow_mut();
        if t.notifying {
            // Listeners of the running recomputation re-marked the tree dirty;
            // the microtask they scheduled picks it up.
            return;
        }
        if !t.update_scheduled {
            return;
        }
        t.update_scheduled = false;

        let next = t.find_next_focus();
        if t.current_focus == next {
            return;
        }
        let previous = std::mem::replace(&mut t.current_focus, next);
        t.update_count += 1;
        t.notifying = true;
        tracing::debug!("focus changed: {:?} -> {:?}", previous, next);
        (previous, next, t.listeners_of(previous), t.listeners_of(next))
    };
    let _notifying = NotifyingGuard(&**tree);

    if let Some(node) = previous {
        for listener in &lost {
            listener(node, false);
        }
    }
    if let Some(node) = next {
        for listener in &gained {
            listener(node, true);
        }
    }
}

/// Clears the notifying flag once listeners return, including by unwinding
struct NotifyingGuard<'a>(&'a RefCell<FocusTree>);

impl Drop for NotifyingGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut tree) = self.0.try_borrow_mut() {
            tree.notifying = false;
        }
    }
}

impl fmt::Debug for FocusManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree.borrow();
        f.debug_struct("FocusManager")
            .field("scopes", &tree.scopes.len())
            .field("nodes", &tree.nodes.len())
            .field("current_focus", &tree.current_focus)
            .field("update_scheduled", &tree.update_scheduled)
            .finish()
    }
}
