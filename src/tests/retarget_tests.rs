#[cfg(test)]
mod tests {
    use crate::dex::body::TryRegion;
    use crate::lift_method;
    use crate::retarget::{
        BinOp, ExceptionEntry, InvokeKind, JvmKind, Label, NumKind, StackMethod, StackOp, Test,
    };
    use crate::types::{DexType, MethodDesc, MethodRef, SimplePool, ARITHMETIC};

    fn lift(
        params: Vec<DexType>,
        ret: DexType,
        regs: u16,
        code: Vec<u16>,
        tries: Vec<TryRegion>,
        pool: &SimplePool,
    ) -> StackMethod {
        let method = MethodDesc {
            owner: DexType::object("Lcom/example/Demo;"),
            name: "run".to_string(),
            return_type: ret,
            params,
            is_static: true,
        };
        lift_method(method, regs, 0, code, tries, pool).unwrap().stack
    }

    fn position(ops: &[StackOp], op: &StackOp) -> usize {
        ops.iter().position(|o| o == op).unwrap()
    }

    #[test]
    fn straight_line_arithmetic() {
        // const/16 v0, #5; add-int v0, v0, v1; return v0
        // v1 is the argument and maps to slot 0, the local v0 to slot 1.
        let stack = lift(
            vec![DexType::Int],
            DexType::Int,
            2,
            vec![0x0013, 0x0005, 0x0090, 0x0100, 0x000f],
            vec![],
            &SimplePool::default(),
        );
        assert_eq!(
            stack.ops,
            vec![
                StackOp::Mark(Label(0)),
                StackOp::PushInt(5),
                StackOp::Store { kind: JvmKind::Int, slot: 1 },
                StackOp::Load { kind: JvmKind::Int, slot: 1 },
                StackOp::Load { kind: JvmKind::Int, slot: 0 },
                StackOp::Binary(BinOp::Add, NumKind::Int),
                StackOp::Store { kind: JvmKind::Int, slot: 1 },
                StackOp::Load { kind: JvmKind::Int, slot: 1 },
                StackOp::Return(Some(JvmKind::Int)),
            ]
        );
        assert_eq!(stack.max_stack, 2);
        assert_eq!(stack.max_locals, 2);
        assert!(stack.exception_table.is_empty());
    }

    #[test]
    fn not_lowered_to_xor() {
        // not-int v0, v1; return v0
        let stack = lift(
            vec![DexType::Int],
            DexType::Int,
            2,
            vec![0x107c, 0x000f],
            vec![],
            &SimplePool::default(),
        );
        assert_eq!(
            stack.ops,
            vec![
                StackOp::Mark(Label(0)),
                StackOp::Load { kind: JvmKind::Int, slot: 0 },
                StackOp::PushInt(-1),
                StackOp::Binary(BinOp::Xor, NumKind::Int),
                StackOp::Store { kind: JvmKind::Int, slot: 1 },
                StackOp::Load { kind: JvmKind::Int, slot: 1 },
                StackOp::Return(Some(JvmKind::Int)),
            ]
        );
        assert_eq!(stack.max_stack, 2);
    }

    #[test]
    fn reverse_subtract_pushes_literal_first() {
        // rsub-int/lit8 v0, v1, #10; return v0
        let stack = lift(
            vec![DexType::Int],
            DexType::Int,
            2,
            vec![0x00d9, 0x0a01, 0x000f],
            vec![],
            &SimplePool::default(),
        );
        let lit = position(&stack.ops, &StackOp::PushInt(10));
        let reg = position(&stack.ops, &StackOp::Load { kind: JvmKind::Int, slot: 0 });
        assert!(lit < reg);
        assert!(stack.ops.contains(&StackOp::Binary(BinOp::Sub, NumKind::Int)));
    }

    #[test]
    fn shift_pushes_value_first() {
        // shl-int/lit8 v0, v1, #2; return v0
        let stack = lift(
            vec![DexType::Int],
            DexType::Int,
            2,
            vec![0x00e0, 0x0201, 0x000f],
            vec![],
            &SimplePool::default(),
        );
        let lit = position(&stack.ops, &StackOp::PushInt(2));
        let reg = position(&stack.ops, &StackOp::Load { kind: JvmKind::Int, slot: 0 });
        assert!(reg < lit);
        assert!(stack.ops.contains(&StackOp::Binary(BinOp::Shl, NumKind::Int)));
    }

    fn pool_with_call(return_type: DexType, params: Vec<DexType>) -> SimplePool {
        SimplePool {
            methods: vec![MethodRef {
                owner: DexType::object("LExample;"),
                name: "f".to_string(),
                return_type,
                params,
            }],
            ..SimplePool::default()
        }
    }

    #[test]
    fn unbound_invoke_result_is_popped() {
        // const/4 v0, #0; invoke-static {v0}, f(I)I; return-void
        let pool = pool_with_call(DexType::Int, vec![DexType::Int]);
        let stack = lift(
            vec![],
            DexType::Void,
            1,
            vec![0x0012, 0x1071, 0x0000, 0x0000, 0x000e],
            vec![],
            &pool,
        );
        let call = StackOp::Invoke {
            kind: InvokeKind::Static,
            owner: "Example".to_string(),
            name: "f".to_string(),
            descriptor: "(I)I".to_string(),
        };
        let at = position(&stack.ops, &call);
        assert_eq!(stack.ops[at + 1], StackOp::Pop);
    }

    #[test]
    fn wide_invoke_result_is_stored() {
        // const-wide/16 v0, #0; invoke-static {v0, v1}, f(J)J;
        // move-result-wide v0; return-wide v0
        let pool = pool_with_call(DexType::Long, vec![DexType::Long]);
        let stack = lift(
            vec![],
            DexType::Long,
            2,
            vec![0x0016, 0x0000, 0x2071, 0x0000, 0x0010, 0x000b, 0x0010],
            vec![],
            &pool,
        );
        let call = StackOp::Invoke {
            kind: InvokeKind::Static,
            owner: "Example".to_string(),
            name: "f".to_string(),
            descriptor: "(J)J".to_string(),
        };
        let at = position(&stack.ops, &call);
        assert_eq!(stack.ops[at + 1], StackOp::Store { kind: JvmKind::Long, slot: 0 });
        assert!(!stack.ops.contains(&StackOp::Pop2));
        assert_eq!(stack.max_stack, 2);
    }

    #[test]
    fn switch_lowering() {
        let code = vec![
            0x012b, 0x000b, 0x0000, // 0: packed-switch v1, +11
            0x0012, 0x000f, // 3: default: return 0
            0x1012, 0x000f, // 5: return 1
            0x2012, 0x000f, // 7: return 2
            0x3012, 0x000f, // 9: return 3
            0x0100, 0x0003, 0x0000, 0x0000,
            0x0005, 0x0000, 0x0007, 0x0000, 0x0009, 0x0000,
        ];
        let stack = lift(vec![DexType::Int], DexType::Int, 2, code, vec![], &SimplePool::default());
        let expected = StackOp::TableSwitch {
            low: 0,
            high: 2,
            default: Label(3),
            targets: vec![Label(5), Label(7), Label(9)],
        };
        assert!(stack.ops.contains(&expected));
    }

    #[test]
    fn exception_table_and_handler_entry() {
        // div-int v0, v1, v2 in a try; return-void;
        // handler: move-exception v0; return-void
        let stack = lift(
            vec![DexType::Int, DexType::Int],
            DexType::Void,
            3,
            vec![0x0093, 0x0201, 0x000e, 0x000d, 0x000e],
            vec![TryRegion {
                start_pc: 0,
                end_pc: 2,
                handler_pc: 3,
                catch_type: Some(DexType::object(ARITHMETIC)),
            }],
            &SimplePool::default(),
        );
        assert_eq!(
            stack.exception_table,
            vec![ExceptionEntry {
                start: Label(0),
                end: Label(2),
                handler: Label(3),
                catch_type: Some("java/lang/ArithmeticException".to_string()),
            }]
        );
        // the caught exception is stored straight off the stack
        let mark = position(&stack.ops, &StackOp::Mark(Label(3)));
        assert_eq!(
            stack.ops[mark + 1],
            StackOp::Store { kind: JvmKind::Reference, slot: 2 }
        );
        // the value live at handler entry counts toward max_stack
        assert!(stack.max_stack >= 1);
    }

    #[test]
    fn null_check_compares_references() {
        // const/4 v0, #0; if-eq v0, v1, 4; return-void; [4] return-void
        // v1 is a reference argument, so the null constant and the test
        // both come out as references
        let stack = lift(
            vec![DexType::object("Ljava/lang/String;")],
            DexType::Void,
            2,
            vec![0x0012, 0x1032, 0x0003, 0x000e, 0x000e],
            vec![],
            &SimplePool::default(),
        );
        assert_eq!(
            stack.ops,
            vec![
                StackOp::Mark(Label(0)),
                StackOp::PushNull,
                StackOp::Store { kind: JvmKind::Reference, slot: 1 },
                StackOp::Load { kind: JvmKind::Reference, slot: 1 },
                StackOp::Load { kind: JvmKind::Reference, slot: 0 },
                StackOp::If(Test::RefEq, Label(4)),
                StackOp::Mark(Label(3)),
                StackOp::Return(None),
                StackOp::Mark(Label(4)),
                StackOp::Return(None),
            ]
        );
    }

    #[test]
    fn handler_entries_do_not_inflate_max_stack() {
        // two guarded divisions, each with its own arithmetic handler;
        // the deepest point of the method is the two division operands
        let region = |start: u32, handler: u32| TryRegion {
            start_pc: start,
            end_pc: start + 2,
            handler_pc: handler,
            catch_type: Some(DexType::object(ARITHMETIC)),
        };
        let stack = lift(
            vec![DexType::Int, DexType::Int],
            DexType::Void,
            3,
            vec![
                0x0093, 0x0201, // 0: div-int v0, v1, v2
                0x0093, 0x0201, // 2: div-int v0, v1, v2
                0x000e, // 4: return-void
                0x000d, 0x000e, // 5: move-exception v0; return-void
                0x000d, 0x000e, // 7: move-exception v0; return-void
            ],
            vec![region(0, 5), region(2, 7)],
            &SimplePool::default(),
        );
        assert_eq!(stack.exception_table.len(), 2);
        assert_eq!(stack.max_stack, 2);
    }

    #[test]
    fn relocated_block_is_emitted_last() {
        // see cfg_tests::relocation_out_of_region for the layout
        let stack = lift(
            vec![],
            DexType::Void,
            1,
            vec![0x0012, 0x0428, 0x1012, 0x000e, 0x2012, 0xfd28],
            vec![TryRegion { start_pc: 0, end_pc: 4, handler_pc: 4, catch_type: None }],
            &SimplePool::default(),
        );
        let marks: Vec<&StackOp> = stack
            .ops
            .iter()
            .filter(|o| matches!(o, StackOp::Mark(_)))
            .collect();
        assert_eq!(marks.last().unwrap(), &&StackOp::Mark(Label(2)));
        assert!(stack.ops.contains(&StackOp::Goto(Label(2))));
    }

    #[test]
    fn array_fill_lowering() {
        // const/4 v0, #2; new-array v0, v0, [I; fill-array-data v0, <table>;
        // return-object v0
        let pool = SimplePool { types: vec!["[I".to_string()], ..SimplePool::default() };
        let stack = lift(
            vec![],
            DexType::Array(Box::new(DexType::Int)),
            1,
            vec![
                0x0012, // const/4 v0, #2 -- value irrelevant, see below
                0x0023, 0x0000, // new-array v0, v0, type@0
                0x0026, 0x0004, 0x0000, // fill-array-data v0, +4
                0x0011, // return-object v0
                0x0300, 0x0002, // ident, width 2
                0x0002, 0x0000, // count 2
                0x0007, 0xfff9, // values 7, -7
            ],
            vec![],
            &pool,
        );
        assert!(stack.ops.contains(&StackOp::NewArray(DexType::Int)));
        let first = position(&stack.ops, &StackOp::PushInt(7));
        assert!(stack.ops[first..].contains(&StackOp::PushInt(-7)));
    }
}
