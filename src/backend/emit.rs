//! Per-instruction-kind RISC-V templates (§4.8). Spill-everywhere: every
//! intermediate value round-trips through its stack slot between
//! statements, so there is no live-range tracking to get wrong.

use koopa::ir::{BinaryOp as KoopaBinaryOp, FunctionData, Program, Value, ValueKind};

use super::error::BackendError;
use super::frame::{self, FramePlan};
use super::imm;

pub struct Backend<'p> {
    program: &'p Program,
    out: String,
}

impl<'p> Backend<'p> {
    pub fn new(program: &'p Program) -> Self {
        Backend { program, out: String::new() }
    }

    pub fn emit_program(mut self) -> Result<String, BackendError> {
        self.emit_globals()?;
        self.out.push_str("  .text\n");
        let funcs: Vec<_> = self.program.func_layout().to_vec();
        for func in funcs {
            let data = self.program.func(func);
            if data.layout().entry_bb().is_none() {
                continue;
            }
            self.emit_func(data)?;
        }
        Ok(self.out)
    }

    fn emit_globals(&mut self) -> Result<(), BackendError> {
        let globals: Vec<_> = self.program.inst_layout().to_vec();
        if globals.is_empty() {
            return Ok(());
        }
        self.out.push_str("  .data\n");
        for v in globals {
            let data = self.program.borrow_value(v);
            let name = data
                .name()
                .clone()
                .map(|n| n.trim_start_matches('@').to_string())
                .ok_or_else(|| BackendError::Unsupported("unnamed global".into()))?;
            let init = match data.kind() {
                ValueKind::GlobalAlloc(alloc) => alloc.init(),
                _ => return Err(BackendError::Unsupported("global value is not an alloc".into())),
            };
            drop(data);
            let words = flatten_global(self.program, init);
            self.out.push_str(&format!("  .globl {name}\n{name}:\n"));
            emit_words(&mut self.out, &words);
        }
        self.out.push('\n');
        Ok(())
    }

    fn emit_func(&mut self, func: &FunctionData) -> Result<(), BackendError> {
        let plan = frame::plan(func);
        let name = func.name().trim_start_matches('@');
        self.out.push_str(&format!("  .text\n  .globl {name}\n{name}:\n"));
        self.emit_prologue(&plan);

        let entry = func.layout().entry_bb();
        for (bb, node) in func.layout().bbs() {
            if Some(bb) != entry {
                let label = func
                    .dfg()
                    .bb(bb)
                    .name()
                    .clone()
                    .unwrap_or_else(|| format!("%bb_{}", bb.index()));
                self.out.push_str(&format!("{}:\n", label.trim_start_matches('%')));
            }
            for &inst in node.insts().keys() {
                self.emit_inst(func, &plan, inst)?;
            }
        }
        self.out.push('\n');
        Ok(())
    }

    fn emit_prologue(&mut self, plan: &FramePlan) {
        if plan.total == 0 {
            return;
        }
        if plan.total <= 2047 {
            self.out.push_str(&format!("  addi sp, sp, -{}\n", plan.total));
        } else {
            self.out.push_str(&format!("  li t0, -{}\n  add sp, sp, t0\n", plan.total));
        }
        if let Some(off) = plan.ra_slot {
            imm::emit_store(&mut self.out, "ra", off);
        }
    }

    fn emit_epilogue(&mut self, plan: &FramePlan) {
        if let Some(off) = plan.ra_slot {
            imm::emit_load(&mut self.out, "ra", off);
        }
        if plan.total != 0 {
            if plan.total <= 2047 {
                self.out.push_str(&format!("  addi sp, sp, {}\n", plan.total));
            } else {
                self.out.push_str(&format!("  li t0, {}\n  add sp, sp, t0\n", plan.total));
            }
        }
        self.out.push_str("  ret\n");
    }

    /// Materialize `v`'s value into `reg`: an inline `li` for a
    /// constant, a register move or caller-overflow-area load for a
    /// function argument reference, otherwise a load from its assigned
    /// slot.
    fn load_operand(&mut self, func: &FunctionData, plan: &FramePlan, v: Value, reg: &str) {
        if let Some(n) = as_const(func, v) {
            self.out.push_str(&format!("  li {reg}, {n}\n"));
            return;
        }
        if let Some(idx) = as_func_arg_index(func, v) {
            if idx < 8 {
                self.out.push_str(&format!("  mv {reg}, a{idx}\n"));
            } else {
                imm::emit_load(&mut self.out, reg, plan.total + 4 * (idx as i32 - 8));
            }
            return;
        }
        let off = plan.slots.get(v).expect("every non-constant value has a slot");
        imm::emit_load(&mut self.out, reg, off);
    }

    fn store_result(&mut self, plan: &FramePlan, v: Value, reg: &str) {
        if let Some(off) = plan.slots.get(v) {
            imm::emit_store(&mut self.out, reg, off);
        }
    }

    fn emit_inst(&mut self, func: &FunctionData, plan: &FramePlan, inst: Value) -> Result<(), BackendError> {
        let data = func.dfg().value(inst).clone();
        match data.kind() {
            ValueKind::Alloc(_) => Ok(()),
            ValueKind::Integer(_) | ValueKind::ZeroInit(_) | ValueKind::Undef(_) => Ok(()),

            ValueKind::Load(load) => {
                let src = load.src();
                if is_global(func, src) {
                    let name = global_name(self.program, func, src);
                    self.out.push_str(&format!("  la t0, {name}\n  lw t0, 0(t0)\n"));
                } else if is_alloc(func, src) {
                    let off = plan.slots.get(src).expect("alloc has a slot");
                    imm::emit_load(&mut self.out, "t0", off);
                } else {
                    // src is itself a pointer-typed SSA value (GEP/getptr
                    // result, or a loaded pointer parameter): load the
                    // pointer, then dereference it.
                    let off = plan.slots.get(src).expect("pointer value has a slot");
                    imm::emit_load(&mut self.out, "t0", off);
                    self.out.push_str("  lw t0, 0(t0)\n");
                }
                self.store_result(plan, inst, "t0");
                Ok(())
            }

            ValueKind::Store(store) => {
                let val = store.value();
                self.load_operand(func, plan, val, "t0");
                let dest = store.dest();
                if is_global(func, dest) {
                    let name = global_name(self.program, func, dest);
                    self.out.push_str(&format!("  la t3, {name}\n  sw t0, 0(t3)\n"));
                } else if is_alloc(func, dest) {
                    let off = plan.slots.get(dest).expect("alloc has a slot");
                    imm::emit_store(&mut self.out, "t0", off);
                } else {
                    let off = plan.slots.get(dest).expect("pointer value has a slot");
                    imm::emit_load(&mut self.out, "t3", off);
                    self.out.push_str("  sw t0, 0(t3)\n");
                }
                Ok(())
            }

            ValueKind::Binary(bin) => {
                self.load_operand(func, plan, bin.lhs(), "t1");
                self.load_operand(func, plan, bin.rhs(), "t2");
                emit_binary_op(&mut self.out, bin.op());
                self.store_result(plan, inst, "t0");
                Ok(())
            }

            ValueKind::Branch(br) => {
                self.load_operand(func, plan, br.cond(), "t0");
                let true_label = bb_label(func, br.true_bb());
                let false_label = bb_label(func, br.false_bb());
                self.out.push_str(&format!("  bnez t0, {true_label}\n  j {false_label}\n"));
                Ok(())
            }

            ValueKind::Jump(j) => {
                let label = bb_label(func, j.target());
                self.out.push_str(&format!("  j {label}\n"));
                Ok(())
            }

            ValueKind::Return(ret) => {
                if let Some(v) = ret.value() {
                    self.load_operand(func, plan, v, "a0");
                }
                self.emit_epilogue(plan);
                Ok(())
            }

            ValueKind::Call(call) => {
                let args: Vec<_> = call.args().to_vec();
                for (i, &a) in args.iter().enumerate() {
                    if i < 8 {
                        self.load_operand(func, plan, a, &format!("a{i}"));
                    } else {
                        self.load_operand(func, plan, a, "t0");
                        imm::emit_store(&mut self.out, "t0", 4 * (i as i32 - 8));
                    }
                }
                let callee_name = self.program.func(call.callee()).name().trim_start_matches('@').to_string();
                self.out.push_str(&format!("  call {callee_name}\n"));
                if !data.ty().is_unit() {
                    self.store_result(plan, inst, "a0");
                }
                Ok(())
            }

            ValueKind::GetElemPtr(gep) => {
                self.emit_gep(func, plan, inst, gep.src(), gep.index(), true)
            }
            ValueKind::GetPtr(gp) => {
                self.emit_gep(func, plan, inst, gp.src(), gp.index(), false)
            }

            other => Err(BackendError::Unsupported(format!("unhandled IR value kind: {other:?}"))),
        }
    }

    /// `strips_dim == true` for `getelemptr` (array indexing, strides by
    /// one dimension of the element type); `false` for `getptr`
    /// (pointer arithmetic, stride is the whole pointee size, unchanged
    /// across the step).
    fn emit_gep(
        &mut self,
        func: &FunctionData,
        plan: &FramePlan,
        result: Value,
        src: Value,
        index: Value,
        strips_dim: bool,
    ) -> Result<(), BackendError> {
        // Base address into t0.
        if is_global(func, src) {
            let name = global_name(self.program, func, src);
            self.out.push_str(&format!("  la t0, {name}\n"));
        } else if is_alloc(func, src) {
            let off = plan.slots.get(src).expect("alloc has a slot");
            imm::emit_addr_of(&mut self.out, "t0", off);
        } else {
            let off = plan.slots.get(src).expect("pointer value has a slot");
            imm::emit_load(&mut self.out, "t0", off);
        }

        let stride = self.stride_for(func, src, strips_dim);
        self.load_operand(func, plan, index, "t2");
        self.out.push_str(&format!("  li t1, {stride}\n  mul t1, t1, t2\n  add t0, t0, t1\n"));
        self.store_result(plan, result, "t0");
        Ok(())
    }

    /// The stride (in bytes) that indexing one step into `src` moves by,
    /// derived directly from `src`'s own Koopa type rather than tracked
    /// bookkeeping: `koopa`'s type checker already gives every
    /// `getelemptr`/`getptr` result the correctly decayed pointee type
    /// (§9 "array addressing bookkeeping" — consult the type, keep no
    /// shadow, since this IR library does not hide the post-GEP type).
    fn stride_for(&self, func: &FunctionData, src: Value, strips_dim: bool) -> i32 {
        let ty = func.dfg().value(src).ty().clone();
        let pointee = match ty.kind() {
            koopa::ir::TypeKind::Pointer(inner) => inner.clone(),
            _ => ty,
        };
        if strips_dim {
            match pointee.kind() {
                koopa::ir::TypeKind::Array(elem, _) => size_of(elem),
                _ => 4,
            }
        } else {
            size_of(&pointee)
        }
    }
}

fn size_of(ty: &koopa::ir::Type) -> i32 {
    match ty.kind() {
        koopa::ir::TypeKind::Int32 => 4,
        koopa::ir::TypeKind::Array(inner, n) => size_of(inner) * (*n as i32),
        koopa::ir::TypeKind::Pointer(_) => 4,
        _ => 4,
    }
}

fn as_const(func: &FunctionData, v: Value) -> Option<i32> {
    if v.is_global() {
        return None;
    }
    match func.dfg().value(v).kind() {
        ValueKind::Integer(i) => Some(i.value()),
        ValueKind::ZeroInit(_) => Some(0),
        _ => None,
    }
}

/// `v`'s parameter index if it names a function argument directly (the
/// `store @n_3, @local` prologue pattern `func.rs` emits reads the
/// parameter value itself, which is never allocated a frame slot —
/// it lives in `a0..a7` or the caller's overflow area).
fn as_func_arg_index(func: &FunctionData, v: Value) -> Option<usize> {
    if v.is_global() {
        return None;
    }
    match func.dfg().value(v).kind() {
        ValueKind::FuncArgRef(arg) => Some(arg.index()),
        _ => None,
    }
}

fn is_global(func: &FunctionData, v: Value) -> bool {
    let _ = func;
    v.is_global()
}

fn is_alloc(func: &FunctionData, v: Value) -> bool {
    matches!(func.dfg().value(v).kind(), ValueKind::Alloc(_))
}

fn global_name(program: &Program, func: &FunctionData, v: Value) -> String {
    if v.is_global() {
        program
            .borrow_value(v)
            .name()
            .clone()
            .map(|n| n.trim_start_matches('@').to_string())
            .unwrap_or_default()
    } else {
        func.dfg()
            .value(v)
            .name()
            .clone()
            .map(|n| n.trim_start_matches('@').to_string())
            .unwrap_or_default()
    }
}

fn bb_label(func: &FunctionData, bb: koopa::ir::BasicBlock) -> String {
    func.dfg()
        .bb(bb)
        .name()
        .clone()
        .map(|n| n.trim_start_matches('%').to_string())
        .unwrap_or_else(|| format!("bb_{}", bb.index()))
}

fn emit_binary_op(out: &mut String, op: KoopaBinaryOp) {
    match op {
        KoopaBinaryOp::Add => out.push_str("  add t0, t1, t2\n"),
        KoopaBinaryOp::Sub => out.push_str("  sub t0, t1, t2\n"),
        KoopaBinaryOp::Mul => out.push_str("  mul t0, t1, t2\n"),
        KoopaBinaryOp::Div => out.push_str("  div t0, t1, t2\n"),
        KoopaBinaryOp::Mod => out.push_str("  rem t0, t1, t2\n"),
        KoopaBinaryOp::Eq => out.push_str("  xor t0, t1, t2\n  seqz t0, t0\n"),
        KoopaBinaryOp::NotEq => out.push_str("  xor t0, t1, t2\n  snez t0, t0\n"),
        KoopaBinaryOp::Lt => out.push_str("  slt t0, t1, t2\n"),
        KoopaBinaryOp::Gt => out.push_str("  sgt t0, t1, t2\n"),
        KoopaBinaryOp::Le => out.push_str("  sgt t0, t1, t2\n  seqz t0, t0\n"),
        KoopaBinaryOp::Ge => out.push_str("  slt t0, t1, t2\n  seqz t0, t0\n"),
        KoopaBinaryOp::And => out.push_str("  and t0, t1, t2\n"),
        KoopaBinaryOp::Or => out.push_str("  or t0, t1, t2\n"),
        _ => out.push_str("  # unsupported binary op\n"),
    }
}

/// Flatten a global initializer value (`Integer`/`ZeroInit`/`Aggregate`)
/// into a flat word list, `None` standing for a zero word.
fn flatten_global(program: &Program, v: Value) -> Vec<Option<i32>> {
    let data = program.borrow_value(v);
    match data.kind() {
        ValueKind::Integer(i) => vec![Some(i.value())],
        ValueKind::ZeroInit(_) => vec![None; (size_of(data.ty()) / 4) as usize],
        ValueKind::Aggregate(agg) => {
            let elems: Vec<_> = agg.elems().to_vec();
            drop(data);
            elems.into_iter().flat_map(|e| flatten_global(program, e)).collect()
        }
        _ => vec![None],
    }
}

fn emit_words(out: &mut String, words: &[Option<i32>]) {
    // Collapse runs of zero words into one `.zero` directive; a run of
    // length one is just as readable as a `.word 0`, so only bother
    // collapsing runs of two or more.
    let mut i = 0;
    while i < words.len() {
        if words[i].is_none() {
            let mut j = i;
            while j < words.len() && words[j].is_none() {
                j += 1;
            }
            if j - i >= 2 {
                out.push_str(&format!("  .zero {}\n", (j - i) * 4));
                i = j;
                continue;
            }
        }
        match words[i] {
            Some(n) => out.push_str(&format!("  .word {n}\n")),
            None => out.push_str("  .word 0\n"),
        }
        i += 1;
    }
}
