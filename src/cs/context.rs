// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result};
use std::hash::Hash;
use std::rc::Rc;

use crate::heap::{HeapModel, ObjId};
use crate::ir::{CallSiteId, Program, TypeId};
use crate::util::index_vec::IndexVec;

crate::newtype_index! {
    /// The unique identifier for each context.
    pub struct ContextId;
}

/// Every context cache registers the empty context first.
pub const EMPTY_CONTEXT: ContextId = ContextId::from_u32(0);

pub trait ContextElement: Clone + Eq + PartialEq + Debug + Hash {
    /// A human-readable rendering of the element.
    fn display(&self, _program: &Program, _heap: &HeapModel) -> String {
        format!("{:?}", self)
    }
}

/// A finite sequence of context elements, oldest first.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Context<E: ContextElement> {
    pub(crate) context_elems: Vec<E>,
}

impl<E: ContextElement> Debug for Context<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        self.context_elems.fmt(f)
    }
}

impl<E: ContextElement> Context<E> {
    pub fn new_empty() -> Rc<Self> {
        Rc::new(Context {
            context_elems: Vec::new(),
        })
    }

    pub fn new(context_elems: Vec<E>) -> Rc<Self> {
        Rc::new(Context { context_elems })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.context_elems.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.context_elems.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<&E> {
        self.context_elems.get(i)
    }

    pub fn elements(&self) -> &[E] {
        &self.context_elems
    }

    /// The most recently added element.
    pub fn last_context_element(&self) -> Option<&E> {
        self.context_elems.last()
    }

    /// Appends `elem` to `old_ctx`, keeping only the `k` most recent elements.
    pub fn new_k_limited_context(old_ctx: &Context<E>, elem: E, k: usize) -> Rc<Self> {
        if k == 0 {
            return Self::new_empty();
        }
        let keep = old_ctx.len().min(k - 1);
        let mut elems = Vec::with_capacity(keep + 1);
        elems.extend_from_slice(&old_ctx.context_elems[old_ctx.len() - keep..]);
        elems.push(elem);
        Rc::new(Context { context_elems: elems })
    }

    /// The `k` most recent elements of `ctx`.
    pub fn k_limited_context(ctx: &Rc<Context<E>>, k: usize) -> Rc<Self> {
        if ctx.len() <= k {
            ctx.clone()
        } else {
            let elems = ctx.context_elems[ctx.len() - k..].to_vec();
            Rc::new(Context { context_elems: elems })
        }
    }
}

/// Interns contexts so that structurally equal contexts share one [`ContextId`].
#[derive(Debug)]
pub struct ContextCache<E: ContextElement> {
    context_list: IndexVec<ContextId, Rc<Context<E>>>,
    context_to_index_map: HashMap<Rc<Context<E>>, ContextId>,
}

impl<E: ContextElement> Default for ContextCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ContextElement> ContextCache<E> {
    pub fn new() -> ContextCache<E> {
        let mut cache = ContextCache {
            context_list: IndexVec::new(),
            context_to_index_map: HashMap::new(),
        };
        let empty = cache.get_context_id(&Context::new_empty());
        debug_assert_eq!(empty, EMPTY_CONTEXT);
        cache
    }

    /// Returns the id of `context`, registering it if it is new.
    pub fn get_context_id(&mut self, context: &Rc<Context<E>>) -> ContextId {
        if let Some(id) = self.context_to_index_map.get(context) {
            *id
        } else {
            let id = self.context_list.push(context.clone());
            self.context_to_index_map.insert(context.clone(), id);
            id
        }
    }

    pub fn get_context(&self, id: ContextId) -> Option<Rc<Context<E>>> {
        self.context_list.get(id).cloned()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.context_list.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.context_list.is_empty()
    }
}

// Different kinds of context elements supported now
impl ContextElement for CallSiteId {
    fn display(&self, program: &Program, _heap: &HeapModel) -> String {
        program.call_site_display(*self)
    }
}

impl ContextElement for ObjId {
    fn display(&self, program: &Program, heap: &HeapModel) -> String {
        heap.obj(*self).display(program)
    }
}

impl ContextElement for TypeId {
    fn display(&self, program: &Program, _heap: &HeapModel) -> String {
        program.type_name(*self).to_string()
    }
}

impl ContextElement for () {}
