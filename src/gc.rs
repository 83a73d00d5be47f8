//! Generational mark-and-sweep garbage collector
//!
//! The heap stores every managed object in a slot vector. Handles
//! ([`GcRef`]) carry the slot index plus a version counter, so stale
//! handles are detected when slots are reused instead of being
//! undefined behaviour.
//!
//! Objects are born in the young generation and promoted to the old
//! generation after surviving two minor cycles. Marking follows the
//! tri-colour discipline (white = unseen, grey = queued, black =
//! scanned); an incremental mode advances one phase step per call,
//! bounded by a wall-clock budget.

use std::mem;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::array::JsArray;
use crate::error::JsError;
use crate::object::JsObject;
use crate::string::JsString;
use crate::value::{FunctionKind, JsFunction, Value};

const INITIAL_HEAP_SIZE: usize = 1024 * 1024;
const GROWTH_FACTOR: usize = 2;
const COLLECTION_THRESHOLD: f64 = 0.8;
const YOUNG_GENERATION_SIZE: usize = 256 * 1024;
const INCREMENTAL_STEP_SIZE: usize = 100;
const PROMOTION_THRESHOLD: u8 = 2;

const MARK_WHITE: u8 = 0;
const MARK_GRAY: u8 = 1;
const MARK_BLACK: u8 = 2;

/// Handle to a managed heap object.
///
/// Stable across collections (the heap is non-moving). The version
/// counter detects handles that outlived their object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GcRef {
    index: u32,
    version: u32,
}

/// Identifier of a persistent root registered with [`Heap::add_root`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootId(u32);

/// Handle to a weak reference created with [`Heap::create_weak_ref`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeakRef(u32);

/// Supplies additional live roots at collection time.
///
/// The VM implements this for its operand and call stacks, the
/// compiler for its half-built constant pools. Collections triggered
/// by allocation trace these in addition to the heap's own root sets.
pub trait RootProvider {
    fn visit_roots(&self, visitor: &mut dyn FnMut(Value));
}

/// Provider for call sites whose values are already rooted elsewhere.
pub struct NoRoots;

impl RootProvider for NoRoots {
    fn visit_roots(&self, _visitor: &mut dyn FnMut(Value)) {}
}

/// Payload of one heap allocation. The enum discriminant is the
/// header's type tag.
#[derive(Debug)]
pub enum HeapObject {
    String(JsString),
    Object(JsObject),
    Array(JsArray),
    Function(JsFunction),
}

impl HeapObject {
    /// Approximate retained size used for collection heuristics.
    fn heap_size_bytes(&self) -> usize {
        match self {
            HeapObject::String(s) => mem::size_of::<JsString>() + s.len(),
            HeapObject::Object(o) => {
                mem::size_of::<JsObject>()
                    + o.properties.capacity() * mem::size_of::<crate::object::Property>()
            }
            HeapObject::Array(a) => {
                mem::size_of::<JsArray>() + a.elements.capacity() * mem::size_of::<Value>()
            }
            HeapObject::Function(_) => mem::size_of::<JsFunction>(),
        }
    }

    /// Enqueues every child reference of this object.
    fn trace(&self, visitor: &mut dyn FnMut(GcRef)) {
        match self {
            HeapObject::String(_) => {}
            HeapObject::Object(o) => {
                if let Some(proto) = o.prototype {
                    visitor(proto);
                }
                for prop in &o.properties {
                    visitor(prop.key);
                    if let Some(r) = prop.value.heap_ref() {
                        visitor(r);
                    }
                }
            }
            HeapObject::Array(a) => {
                for element in &a.elements {
                    if let Some(r) = element.heap_ref() {
                        visitor(r);
                    }
                }
            }
            HeapObject::Function(f) => {
                if let Some(name) = f.name {
                    visitor(name);
                }
                if let FunctionKind::Bytecode { chunk, scope } = &f.kind {
                    if let Some(scope) = scope {
                        visitor(*scope);
                    }
                    chunk.visit_values(&mut |v| {
                        if let Some(r) = v.heap_ref() {
                            visitor(r);
                        }
                    });
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Generation {
    Young,
    Old,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GcPhase {
    Idle,
    Marking,
    Sweeping,
    Compacting,
}

struct Slot {
    value: Option<HeapObject>,
    version: u32,
    bytes: usize,
    gen: Generation,
    age: u8,
}

struct WeakEntry {
    target: Option<GcRef>,
    callback: Option<Box<dyn FnMut()>>,
}

/// Read-only collector observables.
#[derive(Debug, Clone, Copy, Default)]
pub struct GcStats {
    pub collections: u64,
    pub allocations: u64,
    pub deallocations: u64,
    pub bytes_allocated: u64,
    pub bytes_freed: u64,
    pub collection_time: Duration,
    pub peak_usage: usize,
    pub live_objects: usize,
    pub used_bytes: usize,
    pub young_bytes: usize,
}

/// The managed heap: allocator, generations, roots, weak references
/// and the runtime-scoped intern table.
pub struct Heap {
    slots: Vec<Slot>,
    marks: Vec<u8>,
    free_list: Vec<u32>,

    heap_size: usize,
    used_bytes: usize,
    young_bytes: usize,
    young_threshold: usize,
    max_heap_size: Option<usize>,

    roots: Vec<Option<Value>>,
    roots_free: Vec<u32>,
    root_stack: Vec<Value>,

    phase: GcPhase,
    gray_stack: Vec<GcRef>,
    incremental_step: usize,

    weak_refs: Vec<Option<WeakEntry>>,
    interned: FxHashMap<Box<str>, GcRef>,

    stats: GcStats,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            marks: Vec::new(),
            free_list: Vec::new(),
            heap_size: INITIAL_HEAP_SIZE,
            used_bytes: 0,
            young_bytes: 0,
            young_threshold: YOUNG_GENERATION_SIZE,
            max_heap_size: None,
            roots: Vec::new(),
            roots_free: Vec::new(),
            root_stack: Vec::new(),
            phase: GcPhase::Idle,
            gray_stack: Vec::new(),
            incremental_step: INCREMENTAL_STEP_SIZE,
            weak_refs: Vec::new(),
            interned: FxHashMap::default(),
            stats: GcStats::default(),
        }
    }

    // ── Configuration ──────────────────────────────────────────────

    /// Hard limit on the heap budget; growth past it fails allocation
    /// with a memory error.
    pub fn set_max_heap_size(&mut self, limit: Option<usize>) {
        self.max_heap_size = limit;
    }

    /// Byte threshold above which an allocation triggers a minor
    /// collection.
    pub fn set_young_threshold(&mut self, threshold: usize) {
        self.young_threshold = threshold;
    }

    pub fn set_incremental_step(&mut self, step: usize) {
        self.incremental_step = step.max(1);
    }

    // ── Observability ──────────────────────────────────────────────

    /// Bytes currently retained by live allocations.
    pub fn memory_usage(&self) -> usize {
        self.used_bytes
    }

    pub fn stats(&self) -> GcStats {
        let mut stats = self.stats;
        stats.live_objects = self.slots.iter().filter(|s| s.value.is_some()).count();
        stats.used_bytes = self.used_bytes;
        stats.young_bytes = self.young_bytes;
        stats
    }

    // ── Allocation ─────────────────────────────────────────────────

    pub fn alloc_string(
        &mut self,
        text: impl Into<String>,
        roots: &dyn RootProvider,
    ) -> Result<GcRef, JsError> {
        self.alloc(HeapObject::String(JsString::new(text.into())), roots)
    }

    pub fn alloc_object(&mut self, roots: &dyn RootProvider) -> Result<GcRef, JsError> {
        self.alloc(HeapObject::Object(JsObject::new()), roots)
    }

    pub fn alloc_array(
        &mut self,
        capacity: usize,
        roots: &dyn RootProvider,
    ) -> Result<GcRef, JsError> {
        self.alloc(HeapObject::Array(JsArray::with_capacity(capacity)), roots)
    }

    pub fn alloc_function(
        &mut self,
        function: JsFunction,
        roots: &dyn RootProvider,
    ) -> Result<GcRef, JsError> {
        self.alloc(HeapObject::Function(function), roots)
    }

    /// Returns the canonical interned string for `text`, allocating it
    /// on first sight. Repeated calls return the identical handle
    /// while the string stays alive.
    pub fn intern(&mut self, text: &str, roots: &dyn RootProvider) -> Result<GcRef, JsError> {
        if let Some(&r) = self.interned.get(text) {
            if self.is_valid(r) {
                return Ok(r);
            }
            self.interned.remove(text);
        }
        let r = self.alloc(
            HeapObject::String(JsString::new_interned(text.to_string())),
            roots,
        )?;
        self.interned.insert(text.into(), r);
        Ok(r)
    }

    fn alloc(&mut self, object: HeapObject, roots: &dyn RootProvider) -> Result<GcRef, JsError> {
        let bytes = object.heap_size_bytes();
        self.ensure_room(bytes, roots)?;

        let index = match self.free_list.pop() {
            Some(index) => index as usize,
            None => {
                self.slots.push(Slot {
                    value: None,
                    version: 0,
                    bytes: 0,
                    gen: Generation::Young,
                    age: 0,
                });
                self.marks.push(MARK_WHITE);
                self.slots.len() - 1
            }
        };

        let slot = &mut self.slots[index];
        slot.value = Some(object);
        slot.bytes = bytes;
        slot.gen = Generation::Young;
        slot.age = 0;
        let r = GcRef {
            index: index as u32,
            version: slot.version,
        };

        self.used_bytes += bytes;
        self.young_bytes += bytes;
        self.stats.allocations += 1;
        self.stats.bytes_allocated += bytes as u64;
        self.stats.peak_usage = self.stats.peak_usage.max(self.used_bytes);

        // Tri-colour invariant: an object born mid-cycle must not stay
        // white, or the pending sweep would reclaim it.
        if self.phase != GcPhase::Idle {
            self.marks[index] = MARK_GRAY;
            if self.phase == GcPhase::Marking {
                self.gray_stack.push(r);
            }
        }

        Ok(r)
    }

    fn ensure_room(&mut self, bytes: usize, roots: &dyn RootProvider) -> Result<(), JsError> {
        if self.young_bytes + bytes > self.young_threshold {
            self.collect_young(roots);
        }
        if (self.used_bytes + bytes) as f64 > self.heap_size as f64 * COLLECTION_THRESHOLD {
            self.collect_full(roots);
        }
        while self.used_bytes + bytes > self.heap_size {
            let next = self.heap_size.saturating_mul(GROWTH_FACTOR);
            if let Some(max) = self.max_heap_size {
                if next > max {
                    return Err(JsError::memory_error("heap limit exceeded"));
                }
            }
            self.heap_size = next;
        }
        Ok(())
    }

    // ── Handle access ──────────────────────────────────────────────

    fn slot_index(&self, r: GcRef) -> Option<usize> {
        let index = r.index as usize;
        let slot = self.slots.get(index)?;
        if slot.version != r.version || slot.value.is_none() {
            return None;
        }
        Some(index)
    }

    /// Whether `r` still points at a live allocation.
    pub fn is_valid(&self, r: GcRef) -> bool {
        self.slot_index(r).is_some()
    }

    fn payload(&self, r: GcRef) -> Result<&HeapObject, JsError> {
        let index = self
            .slot_index(r)
            .ok_or_else(|| JsError::runtime_error("invalid heap handle"))?;
        self.slots[index]
            .value
            .as_ref()
            .ok_or_else(|| JsError::runtime_error("invalid heap handle"))
    }

    fn payload_mut(&mut self, r: GcRef) -> Result<&mut HeapObject, JsError> {
        let index = self
            .slot_index(r)
            .ok_or_else(|| JsError::runtime_error("invalid heap handle"))?;
        self.slots[index]
            .value
            .as_mut()
            .ok_or_else(|| JsError::runtime_error("invalid heap handle"))
    }

    pub fn string(&self, r: GcRef) -> Result<&JsString, JsError> {
        match self.payload(r)? {
            HeapObject::String(s) => Ok(s),
            _ => Err(JsError::type_error("value is not a string")),
        }
    }

    pub fn object(&self, r: GcRef) -> Result<&JsObject, JsError> {
        match self.payload(r)? {
            HeapObject::Object(o) => Ok(o),
            _ => Err(JsError::type_error("value is not an object")),
        }
    }

    pub fn object_mut(&mut self, r: GcRef) -> Result<&mut JsObject, JsError> {
        match self.payload_mut(r)? {
            HeapObject::Object(o) => Ok(o),
            _ => Err(JsError::type_error("value is not an object")),
        }
    }

    pub fn array(&self, r: GcRef) -> Result<&JsArray, JsError> {
        match self.payload(r)? {
            HeapObject::Array(a) => Ok(a),
            _ => Err(JsError::type_error("value is not an array")),
        }
    }

    pub fn array_mut(&mut self, r: GcRef) -> Result<&mut JsArray, JsError> {
        match self.payload_mut(r)? {
            HeapObject::Array(a) => Ok(a),
            _ => Err(JsError::type_error("value is not an array")),
        }
    }

    pub fn function(&self, r: GcRef) -> Result<&JsFunction, JsError> {
        match self.payload(r)? {
            HeapObject::Function(f) => Ok(f),
            _ => Err(JsError::type_error("value is not a function")),
        }
    }

    /// Reconstructs the tagged value for a live handle.
    pub fn value_of(&self, r: GcRef) -> Option<Value> {
        let index = self.slot_index(r)?;
        match self.slots[index].value.as_ref()? {
            HeapObject::String(_) => Some(Value::String(r)),
            HeapObject::Object(_) => Some(Value::Object(r)),
            HeapObject::Array(_) => Some(Value::Array(r)),
            HeapObject::Function(_) => Some(Value::Function(r)),
        }
    }

    /// Recomputes a slot's retained-size estimate after its payload
    /// grew or shrank.
    pub(crate) fn refresh_bytes(&mut self, r: GcRef) {
        let Some(index) = self.slot_index(r) else {
            return;
        };
        let new_bytes = match self.slots[index].value.as_ref() {
            Some(payload) => payload.heap_size_bytes(),
            None => return,
        };
        let slot = &mut self.slots[index];
        let old_bytes = slot.bytes;
        slot.bytes = new_bytes;
        if new_bytes >= old_bytes {
            let grown = new_bytes - old_bytes;
            self.used_bytes += grown;
            if slot.gen == Generation::Young {
                self.young_bytes += grown;
            }
        } else {
            let shrunk = old_bytes - new_bytes;
            self.used_bytes = self.used_bytes.saturating_sub(shrunk);
            if slot.gen == Generation::Young {
                self.young_bytes = self.young_bytes.saturating_sub(shrunk);
            }
        }
        self.stats.peak_usage = self.stats.peak_usage.max(self.used_bytes);
    }

    // ── Roots ──────────────────────────────────────────────────────

    /// Registers a persistent strong root. The value stays live until
    /// [`Heap::remove_root`].
    pub fn add_root(&mut self, value: Value) -> RootId {
        let index = match self.roots_free.pop() {
            Some(index) => index as usize,
            None => {
                self.roots.push(None);
                self.roots.len() - 1
            }
        };
        self.roots[index] = Some(value);
        RootId(index as u32)
    }

    pub fn get_root(&self, id: RootId) -> Option<Value> {
        self.roots.get(id.0 as usize).copied().flatten()
    }

    pub fn remove_root(&mut self, id: RootId) {
        let index = id.0 as usize;
        if index < self.roots.len() && self.roots[index].take().is_some() {
            self.roots_free.push(id.0);
        }
    }

    /// Pushes a transient pin; pair with [`Heap::pop_roots`]. Used by
    /// operations that allocate while holding values no other root
    /// reaches.
    pub fn push_root(&mut self, value: Value) {
        self.root_stack.push(value);
    }

    pub fn pop_roots(&mut self, count: usize) {
        let new_len = self.root_stack.len().saturating_sub(count);
        self.root_stack.truncate(new_len);
    }

    // ── Weak references ────────────────────────────────────────────

    /// Creates a weak reference to a heap value. The handle yields the
    /// target until a collection proves it unreachable; then it clears
    /// and `callback` (if any) fires exactly once, during that sweep.
    /// Callbacks must not touch the heap.
    pub fn create_weak_ref(
        &mut self,
        target: Value,
        callback: Option<Box<dyn FnMut()>>,
    ) -> Result<WeakRef, JsError> {
        let r = target
            .heap_ref()
            .ok_or_else(|| JsError::type_error("weak reference target must be a heap value"))?;
        if !self.is_valid(r) {
            return Err(JsError::runtime_error("invalid heap handle"));
        }
        self.weak_refs.push(Some(WeakEntry {
            target: Some(r),
            callback,
        }));
        Ok(WeakRef((self.weak_refs.len() - 1) as u32))
    }

    /// The weak target, or `None` once it has been collected.
    pub fn weak_get(&self, w: WeakRef) -> Option<Value> {
        let entry = self.weak_refs.get(w.0 as usize)?.as_ref()?;
        let target = entry.target?;
        self.value_of(target)
    }

    /// Drops a weak reference without waiting for its target to die.
    pub fn release_weak_ref(&mut self, w: WeakRef) {
        if let Some(entry) = self.weak_refs.get_mut(w.0 as usize) {
            *entry = None;
        }
    }

    // ── Collection ─────────────────────────────────────────────────

    /// Marks from all roots and sweeps both generations.
    pub fn collect_full(&mut self, roots: &dyn RootProvider) {
        let start = Instant::now();
        self.abandon_incremental();
        self.phase = GcPhase::Marking;
        self.seed_roots(roots);
        self.mark_until_done();
        self.phase = GcPhase::Sweeping;
        self.sweep(false);
        self.phase = GcPhase::Idle;
        self.stats.collections += 1;
        self.stats.collection_time += start.elapsed();
    }

    /// Minor collection: marks from all roots plus every old object
    /// (the conservative remembered set), sweeps the young generation
    /// only. Survivors age; old enough objects are promoted.
    pub fn collect_young(&mut self, roots: &dyn RootProvider) {
        let start = Instant::now();
        self.abandon_incremental();
        self.phase = GcPhase::Marking;
        self.seed_roots(roots);
        for index in 0..self.slots.len() {
            let slot = &self.slots[index];
            if slot.value.is_some() && slot.gen == Generation::Old {
                let r = GcRef {
                    index: index as u32,
                    version: slot.version,
                };
                self.mark_gray(r);
            }
        }
        self.mark_until_done();
        self.phase = GcPhase::Sweeping;
        self.sweep(true);
        self.phase = GcPhase::Idle;
        self.stats.collections += 1;
        self.stats.collection_time += start.elapsed();
    }

    /// Advances the collector by one phase step, spending at most
    /// `budget_us` microseconds. Phases progress idle → marking →
    /// sweeping → idle; a cycle run to completion frees exactly what a
    /// single full collection from the same start state would.
    pub fn collect_incremental(&mut self, budget_us: u64, roots: &dyn RootProvider) {
        let start = Instant::now();
        let budget = Duration::from_micros(budget_us);
        match self.phase {
            GcPhase::Idle => {
                self.gray_stack.clear();
                self.phase = GcPhase::Marking;
                self.seed_roots(roots);
            }
            GcPhase::Marking => {
                let mut processed = 0;
                loop {
                    if processed >= self.incremental_step || start.elapsed() >= budget {
                        break;
                    }
                    match self.gray_stack.pop() {
                        Some(r) => {
                            self.blacken(r);
                            processed += 1;
                        }
                        None => break,
                    }
                }
                if self.gray_stack.is_empty() {
                    self.phase = GcPhase::Sweeping;
                }
            }
            GcPhase::Sweeping => {
                self.sweep(false);
                self.phase = GcPhase::Idle;
                self.stats.collections += 1;
            }
            GcPhase::Compacting => {
                // Compaction is reserved; the heap is non-moving.
                self.phase = GcPhase::Idle;
            }
        }
        self.stats.collection_time += start.elapsed();
    }

    /// Whether an incremental cycle is mid-flight.
    pub fn incremental_active(&self) -> bool {
        self.phase != GcPhase::Idle
    }

    fn abandon_incremental(&mut self) {
        if self.phase != GcPhase::Idle {
            self.gray_stack.clear();
            self.phase = GcPhase::Idle;
        }
        for mark in &mut self.marks {
            *mark = MARK_WHITE;
        }
    }

    fn seed_roots(&mut self, provider: &dyn RootProvider) {
        let mut seeds: Vec<GcRef> = Vec::new();
        for value in self.roots.iter().flatten() {
            if let Some(r) = value.heap_ref() {
                seeds.push(r);
            }
        }
        for value in &self.root_stack {
            if let Some(r) = value.heap_ref() {
                seeds.push(r);
            }
        }
        provider.visit_roots(&mut |value| {
            if let Some(r) = value.heap_ref() {
                seeds.push(r);
            }
        });
        for r in seeds {
            self.mark_gray(r);
        }
    }

    fn mark_gray(&mut self, r: GcRef) {
        if let Some(index) = self.slot_index(r) {
            if self.marks[index] == MARK_WHITE {
                self.marks[index] = MARK_GRAY;
                self.gray_stack.push(r);
            }
        }
    }

    fn mark_until_done(&mut self) {
        while let Some(r) = self.gray_stack.pop() {
            self.blacken(r);
        }
    }

    fn blacken(&mut self, r: GcRef) {
        let Some(index) = self.slot_index(r) else {
            return;
        };
        if self.marks[index] == MARK_BLACK {
            return;
        }
        self.marks[index] = MARK_BLACK;

        let slots = &self.slots;
        let marks = &mut self.marks;
        let gray_stack = &mut self.gray_stack;
        if let Some(payload) = slots[index].value.as_ref() {
            payload.trace(&mut |child| {
                let child_index = child.index as usize;
                if let Some(slot) = slots.get(child_index) {
                    if slot.version == child.version
                        && slot.value.is_some()
                        && marks[child_index] == MARK_WHITE
                    {
                        marks[child_index] = MARK_GRAY;
                        gray_stack.push(child);
                    }
                }
            });
        }
    }

    fn sweep(&mut self, young_only: bool) {
        for index in 0..self.slots.len() {
            if self.slots[index].value.is_none() {
                continue;
            }
            let gen = self.slots[index].gen;
            if young_only && gen == Generation::Old {
                self.marks[index] = MARK_WHITE;
                continue;
            }

            if self.marks[index] == MARK_WHITE {
                let slot = &mut self.slots[index];
                let bytes = slot.bytes;
                slot.value = None;
                slot.bytes = 0;
                slot.age = 0;
                slot.version = slot.version.wrapping_add(1);
                self.free_list.push(index as u32);
                self.used_bytes = self.used_bytes.saturating_sub(bytes);
                if gen == Generation::Young {
                    self.young_bytes = self.young_bytes.saturating_sub(bytes);
                }
                self.stats.deallocations += 1;
                self.stats.bytes_freed += bytes as u64;
            } else {
                self.marks[index] = MARK_WHITE;
                let new_bytes = match self.slots[index].value.as_ref() {
                    Some(payload) => payload.heap_size_bytes(),
                    None => continue,
                };
                let old_bytes = self.slots[index].bytes;
                self.slots[index].bytes = new_bytes;
                self.used_bytes = self
                    .used_bytes
                    .saturating_sub(old_bytes)
                    .saturating_add(new_bytes);
                if gen == Generation::Young {
                    self.young_bytes = self
                        .young_bytes
                        .saturating_sub(old_bytes)
                        .saturating_add(new_bytes);
                }

                if young_only && gen == Generation::Young {
                    let slot = &mut self.slots[index];
                    slot.age = slot.age.saturating_add(1);
                    if slot.age >= PROMOTION_THRESHOLD {
                        slot.gen = Generation::Old;
                        self.young_bytes = self.young_bytes.saturating_sub(slot.bytes);
                    }
                }
            }
        }

        self.process_weak_refs();
        self.prune_interned();
    }

    /// Clears weak references whose target this cycle reclaimed and
    /// fires their callbacks.
    fn process_weak_refs(&mut self) {
        let mut fired: Vec<Box<dyn FnMut()>> = Vec::new();
        for entry in self.weak_refs.iter_mut().flatten() {
            let Some(target) = entry.target else {
                continue;
            };
            let index = target.index as usize;
            let dead = match self.slots.get(index) {
                Some(slot) => slot.version != target.version || slot.value.is_none(),
                None => true,
            };
            if dead {
                entry.target = None;
                if let Some(callback) = entry.callback.take() {
                    fired.push(callback);
                }
            }
        }
        for mut callback in fired {
            callback();
        }
    }

    /// Drops intern-table entries whose string the sweeper reclaimed.
    fn prune_interned(&mut self) {
        let slots = &self.slots;
        self.interned.retain(|_, r| {
            let index = r.index as usize;
            match slots.get(index) {
                Some(slot) => slot.version == r.version && slot.value.is_some(),
                None => false,
            }
        });
    }
}
