// Copyright (c) 2024 <Wei Li>.
//
// This source code is licensed under the GNU license found in the
// LICENSE file in the root directory of this source tree.

//! Context selection policies.
//!
//! A strategy decides the context of a callee when a call edge is added, and
//! the heap context of an object allocated in a method analyzed under some
//! context. Each strategy owns the cache interning its contexts.

use std::rc::Rc;

use crate::cs::{Context, ContextCache, ContextElement, ContextId, EMPTY_CONTEXT};
use crate::heap::{HeapModel, ObjId};
use crate::ir::{CallSiteId, Program, TypeId};

/// The receiver object of an instance call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReceiverInfo {
    /// The heap context of the receiver object.
    pub heap_context: ContextId,
    pub obj: ObjId,
    /// The runtime type of the receiver object.
    pub ty: TypeId,
}

pub trait ContextStrategy {
    type E: ContextElement;

    fn context_cache(&self) -> &ContextCache<Self::E>;
    fn context_cache_mut(&mut self) -> &mut ContextCache<Self::E>;

    /// The maximum length of the contexts the strategy creates.
    fn context_depth(&self) -> usize;

    /// The context of a callee invoked on `receiver` from `callsite` in a
    /// caller analyzed under `caller`.
    fn new_instance_call_context(
        &mut self,
        caller: ContextId,
        callsite: CallSiteId,
        receiver: &ReceiverInfo,
    ) -> ContextId;

    /// The context of a callee invoked without a receiver.
    fn new_static_call_context(&mut self, caller: ContextId, callsite: CallSiteId) -> ContextId;

    /// The heap context of an object allocated in a method analyzed under `method_ctx`.
    fn new_heap_context(&mut self, method_ctx: ContextId) -> ContextId;

    #[inline]
    fn get_context_id(&mut self, context: &Rc<Context<Self::E>>) -> ContextId {
        self.context_cache_mut().get_context_id(context)
    }

    #[inline]
    fn get_context_by_id(&self, context_id: ContextId) -> Rc<Context<Self::E>> {
        self.context_cache()
            .get_context(context_id)
            .unwrap_or_else(Context::new_empty)
    }

    #[inline]
    fn get_empty_context_id(&self) -> ContextId {
        EMPTY_CONTEXT
    }

    fn num_contexts(&self) -> usize {
        self.context_cache().len()
    }

    /// The elements of a context, rendered for display.
    fn context_elements(&self, context_id: ContextId, program: &Program, heap: &HeapModel) -> Vec<String> {
        self.get_context_by_id(context_id)
            .elements()
            .iter()
            .map(|elem| elem.display(program, heap))
            .collect()
    }

    /// Appends `elem` to the context `base`, keeping the most recent k elements.
    fn append_context(&mut self, base: ContextId, elem: Self::E) -> ContextId {
        let k = self.context_depth();
        let base = self.get_context_by_id(base);
        let context = Context::new_k_limited_context(&base, elem, k);
        self.get_context_id(&context)
    }

    /// The most recent `k` elements of the context `id`.
    fn truncate_context(&mut self, id: ContextId, k: usize) -> ContextId {
        let context = self.get_context_by_id(id);
        if context.len() <= k {
            return id;
        }
        let truncated = Context::k_limited_context(&context, k);
        self.get_context_id(&truncated)
    }
}

/// Every method is analyzed under the empty context.
#[derive(Debug, Default)]
pub struct ContextInsensitive {
    ctx_cache: ContextCache<()>,
}

impl ContextInsensitive {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContextStrategy for ContextInsensitive {
    type E = ();

    fn context_cache(&self) -> &ContextCache<()> {
        &self.ctx_cache
    }

    fn context_cache_mut(&mut self) -> &mut ContextCache<()> {
        &mut self.ctx_cache
    }

    fn context_depth(&self) -> usize {
        0
    }

    fn new_instance_call_context(&mut self, _: ContextId, _: CallSiteId, _: &ReceiverInfo) -> ContextId {
        EMPTY_CONTEXT
    }

    fn new_static_call_context(&mut self, _: ContextId, _: CallSiteId) -> ContextId {
        EMPTY_CONTEXT
    }

    fn new_heap_context(&mut self, _: ContextId) -> ContextId {
        EMPTY_CONTEXT
    }
}

/// k-limited call-string sensitivity.
#[derive(Debug)]
pub struct KCallSiteSensitive {
    k: usize,
    ctx_cache: ContextCache<CallSiteId>,
}

impl KCallSiteSensitive {
    pub fn new(k: usize) -> Self {
        KCallSiteSensitive {
            k,
            ctx_cache: ContextCache::new(),
        }
    }
}

impl ContextStrategy for KCallSiteSensitive {
    type E = CallSiteId;

    fn context_cache(&self) -> &ContextCache<CallSiteId> {
        &self.ctx_cache
    }

    fn context_cache_mut(&mut self) -> &mut ContextCache<CallSiteId> {
        &mut self.ctx_cache
    }

    fn context_depth(&self) -> usize {
        self.k
    }

    fn new_instance_call_context(
        &mut self,
        caller: ContextId,
        callsite: CallSiteId,
        _receiver: &ReceiverInfo,
    ) -> ContextId {
        self.append_context(caller, callsite)
    }

    fn new_static_call_context(&mut self, caller: ContextId, callsite: CallSiteId) -> ContextId {
        self.append_context(caller, callsite)
    }

    fn new_heap_context(&mut self, method_ctx: ContextId) -> ContextId {
        self.truncate_context(method_ctx, self.k.saturating_sub(1))
    }
}

/// The heap context under object and type sensitivity: the method's context
/// while it is shorter than k, otherwise its most recent element alone.
fn receiver_heap_context<S: ContextStrategy>(strategy: &mut S, method_ctx: ContextId) -> ContextId {
    let depth = strategy.get_context_by_id(method_ctx).len();
    if depth < strategy.context_depth() {
        method_ctx
    } else {
        strategy.truncate_context(method_ctx, 1)
    }
}

/// k-limited object sensitivity: contexts are sequences of receiver objects.
#[derive(Debug)]
pub struct KObjectSensitive {
    k: usize,
    ctx_cache: ContextCache<ObjId>,
}

impl KObjectSensitive {
    pub fn new(k: usize) -> Self {
        KObjectSensitive {
            k,
            ctx_cache: ContextCache::new(),
        }
    }
}

impl ContextStrategy for KObjectSensitive {
    type E = ObjId;

    fn context_cache(&self) -> &ContextCache<ObjId> {
        &self.ctx_cache
    }

    fn context_cache_mut(&mut self) -> &mut ContextCache<ObjId> {
        &mut self.ctx_cache
    }

    fn context_depth(&self) -> usize {
        self.k
    }

    fn new_instance_call_context(
        &mut self,
        _caller: ContextId,
        _callsite: CallSiteId,
        receiver: &ReceiverInfo,
    ) -> ContextId {
        self.append_context(receiver.heap_context, receiver.obj)
    }

    fn new_static_call_context(&mut self, caller: ContextId, _callsite: CallSiteId) -> ContextId {
        caller
    }

    fn new_heap_context(&mut self, method_ctx: ContextId) -> ContextId {
        receiver_heap_context(self, method_ctx)
    }
}

/// k-limited type sensitivity: contexts are sequences of receiver types.
#[derive(Debug)]
pub struct KTypeSensitive {
    k: usize,
    ctx_cache: ContextCache<TypeId>,
}

impl KTypeSensitive {
    pub fn new(k: usize) -> Self {
        KTypeSensitive {
            k,
            ctx_cache: ContextCache::new(),
        }
    }
}

impl ContextStrategy for KTypeSensitive {
    type E = TypeId;

    fn context_cache(&self) -> &ContextCache<TypeId> {
        &self.ctx_cache
    }

    fn context_cache_mut(&mut self) -> &mut ContextCache<TypeId> {
        &mut self.ctx_cache
    }

    fn context_depth(&self) -> usize {
        self.k
    }

    fn new_instance_call_context(
        &mut self,
        _caller: ContextId,
        _callsite: CallSiteId,
        receiver: &ReceiverInfo,
    ) -> ContextId {
        self.append_context(receiver.heap_context, receiver.ty)
    }

    fn new_static_call_context(&mut self, caller: ContextId, _callsite: CallSiteId) -> ContextId {
        caller
    }

    fn new_heap_context(&mut self, method_ctx: ContextId) -> ContextId {
        receiver_heap_context(self, method_ctx)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cs::EMPTY_CONTEXT;

    fn receiver(heap_context: ContextId, obj: u32) -> ReceiverInfo {
        ReceiverInfo {
            heap_context,
            obj: ObjId::from_u32(obj),
            ty: TypeId::from_u32(obj % 2),
        }
    }

    #[test]
    fn call_site_contexts_keep_the_last_k_sites() {
        let mut s = KCallSiteSensitive::new(2);
        let (c1, c2, c3) = (CallSiteId::from_u32(1), CallSiteId::from_u32(2), CallSiteId::from_u32(3));
        let ctx1 = s.new_static_call_context(EMPTY_CONTEXT, c1);
        let ctx2 = s.new_instance_call_context(ctx1, c2, &receiver(EMPTY_CONTEXT, 0));
        let ctx3 = s.new_static_call_context(ctx2, c3);
        assert_eq!(s.get_context_by_id(ctx3).elements(), &[c2, c3]);
        assert_eq!(ctx3, s.new_static_call_context(ctx2, c3));
        // Heap contexts keep k - 1 sites.
        let heap = s.new_heap_context(ctx3);
        assert_eq!(s.get_context_by_id(heap).elements(), &[c3]);
    }

    #[test]
    fn object_contexts_follow_the_receiver() {
        let mut s = KObjectSensitive::new(2);
        let c = CallSiteId::from_u32(0);
        let a1 = s.new_instance_call_context(EMPTY_CONTEXT, c, &receiver(EMPTY_CONTEXT, 1));
        assert_eq!(s.get_context_by_id(a1).elements(), &[ObjId::from_u32(1)]);
        // Objects allocated under a short context keep it.
        assert_eq!(s.new_heap_context(a1), a1);

        let b = s.new_instance_call_context(EMPTY_CONTEXT, c, &receiver(a1, 2));
        assert_eq!(
            s.get_context_by_id(b).elements(),
            &[ObjId::from_u32(1), ObjId::from_u32(2)]
        );
        // A full context is cut down to its most recent element.
        let heap = s.new_heap_context(b);
        assert_eq!(s.get_context_by_id(heap).elements(), &[ObjId::from_u32(2)]);
        let c3 = s.new_instance_call_context(b, c, &receiver(b, 3));
        assert_eq!(s.get_context_by_id(c3).len(), 2);
        // Static calls inherit the caller's context.
        assert_eq!(s.new_static_call_context(b, c), b);
    }

    #[test]
    fn type_contexts_use_receiver_types() {
        let mut s = KTypeSensitive::new(1);
        let c = CallSiteId::from_u32(0);
        let t1 = s.new_instance_call_context(EMPTY_CONTEXT, c, &receiver(EMPTY_CONTEXT, 1));
        let t3 = s.new_instance_call_context(EMPTY_CONTEXT, c, &receiver(EMPTY_CONTEXT, 3));
        assert_eq!(t1, t3);
        assert_eq!(s.get_context_by_id(t1).elements(), &[TypeId::from_u32(1)]);
        assert_eq!(s.num_contexts(), 2);
    }

    #[test]
    fn insensitive_always_returns_the_empty_context() {
        let mut s = ContextInsensitive::new();
        let c = CallSiteId::from_u32(0);
        assert_eq!(s.new_static_call_context(EMPTY_CONTEXT, c), EMPTY_CONTEXT);
        assert_eq!(
            s.new_instance_call_context(EMPTY_CONTEXT, c, &receiver(EMPTY_CONTEXT, 1)),
            EMPTY_CONTEXT
        );
        assert_eq!(s.new_heap_context(EMPTY_CONTEXT), EMPTY_CONTEXT);
        assert_eq!(s.num_contexts(), 1);
    }
}
