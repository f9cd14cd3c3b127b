#[cfg(test)]
mod tests {
    use crate::analysis::typing::assign_types;
    use crate::analysis::usedef::UseDefAnalysis;
    use crate::dex::body::{InsnId, MethodBody, TryRegion};
    use crate::dex::error::ErrorKind;
    use crate::dex::instructions::Def;
    use crate::types::{DexType, MethodDesc, SimplePool, THROWABLE};

    fn build(params: Vec<DexType>, ret: DexType, regs: u16, code: Vec<u16>) -> MethodBody {
        let method = MethodDesc {
            owner: DexType::object("Lcom/example/Demo;"),
            name: "run".to_string(),
            return_type: ret,
            params,
            is_static: true,
        };
        MethodBody::build(method, regs, 0, code, vec![], &SimplePool::default()).unwrap()
    }

    fn all_reg_types(body: &MethodBody) -> Vec<Vec<Option<DexType>>> {
        body.order()
            .iter()
            .flat_map(|&b| body.block(b).insns.iter().map(|i| i.reg_types.clone()))
            .collect()
    }

    #[test]
    fn moves_preserve_definitions() {
        // move v0, v2; move v1, v0; add-int v1, v1, v1; return v1
        let mut body = build(
            vec![DexType::Int],
            DexType::Int,
            3,
            vec![0x2001, 0x0101, 0x0190, 0x0101, 0x010f],
        );
        let mut usedef = UseDefAnalysis::new();
        usedef.analyse(&mut body);

        // both add operands resolve through the move chain to the argument
        let add = &body.block(body.entry()).insns[2];
        assert_eq!(add.reg_defs[1].iter().collect::<Vec<_>>(), vec![&Def::Argument(0)]);
        assert_eq!(add.reg_defs[2].iter().collect::<Vec<_>>(), vec![&Def::Argument(0)]);

        // the return reads the add, not the argument
        let add_id = InsnId { block: body.entry(), index: 2 };
        let ret = &body.block(body.entry()).insns[3];
        assert_eq!(ret.reg_defs[0].iter().collect::<Vec<_>>(), vec![&Def::Insn(add_id)]);

        let uses = usedef.uses_of(Def::Argument(0)).unwrap();
        assert_eq!(uses.len(), 3); // two moves and the add
        assert!(usedef.uses_of(Def::Insn(add_id)).is_some());
    }

    #[test]
    fn definitions_merge_at_joins() {
        // if-eqz v1, 4; const/4 v0, #0; goto 5; [4] const/4 v0, #1;
        // [5] return v0
        let mut body = build(
            vec![DexType::Int],
            DexType::Int,
            2,
            vec![0x0138, 0x0004, 0x0012, 0x0228, 0x1012, 0x000f],
        );
        let mut usedef = UseDefAnalysis::new();
        usedef.analyse(&mut body);

        let ret_block = body.block_at(5).unwrap();
        let ret = &body.block(ret_block).insns[0];
        assert_eq!(ret.reg_defs[0].len(), 2);
    }

    #[test]
    fn loop_definitions() {
        // const/4 v0, #0; [1] add-int/lit8 v0, v0, #1; if-ltz v0, 1;
        // [5] return-void
        let mut body = build(
            vec![],
            DexType::Void,
            1,
            vec![0x0012, 0x00d8, 0x0100, 0x003a, 0xfffe, 0x000e],
        );
        let mut usedef = UseDefAnalysis::new();
        usedef.analyse(&mut body);

        // around the back edge the increment sees the const and itself
        let inc_block = body.block_at(1).unwrap();
        let inc = &body.block(inc_block).insns[0];
        assert_eq!(inc.reg_defs[1].len(), 2);
    }

    #[test]
    fn arguments_enter_trailing_registers() {
        // move-wide v0, v2; return-void with (J I) arguments in v2..v4
        let mut body = build(
            vec![DexType::Long, DexType::Int],
            DexType::Void,
            5,
            vec![0x2004, 0x000e],
        );
        let mut usedef = UseDefAnalysis::new();
        usedef.analyse(&mut body);
        assign_types(&mut body, &SimplePool::default()).unwrap();

        let mv = &body.block(body.entry()).insns[0];
        assert_eq!(mv.reg_defs[1].iter().collect::<Vec<_>>(), vec![&Def::Argument(0)]);
        assert_eq!(mv.reg_types[1], Some(DexType::Long));
    }

    #[test]
    fn unconstrained_constants_default() {
        // const/4 v0, #0; const-wide/16 v1, #0; return-void
        let mut body = build(
            vec![],
            DexType::Void,
            3,
            vec![0x0012, 0x0116, 0x0000, 0x000e],
        );
        assign_types(&mut body, &SimplePool::default()).unwrap();
        let insns = &body.block(body.entry()).insns;
        assert_eq!(insns[0].reg_types[0], Some(DexType::Int));
        assert_eq!(insns[1].reg_types[0], Some(DexType::Long));
    }

    #[test]
    fn constant_resolved_by_use() {
        // const/4 v0, #0; neg-float v0, v0; return-void
        let mut body = build(vec![], DexType::Void, 1, vec![0x0012, 0x007f, 0x000e]);
        assign_types(&mut body, &SimplePool::default()).unwrap();
        let insns = &body.block(body.entry()).insns;
        assert_eq!(insns[0].reg_types[0], Some(DexType::Float));
        assert_eq!(insns[1].reg_types[1], Some(DexType::Float));
        assert_eq!(insns[1].reg_types[0], Some(DexType::Float));
    }

    #[test]
    fn constants_merge_across_branches() {
        // both branch arms load an untyped constant into v0; the return
        // forces int on the joined value and both producers
        let mut body = build(
            vec![DexType::Int],
            DexType::Int,
            2,
            vec![0x0138, 0x0004, 0x0012, 0x0228, 0x1012, 0x000f],
        );
        assign_types(&mut body, &SimplePool::default()).unwrap();
        for bid in [body.block_at(2).unwrap(), body.block_at(4).unwrap()] {
            assert_eq!(body.block(bid).insns[0].reg_types[0], Some(DexType::Int));
        }
    }

    #[test]
    fn references_widen_to_object() {
        // if-eqz v1, 4; move-object v0, v1; goto 5;
        // [4] move-object v0, v2; [5] return-object v0
        let mut body = build(
            vec![
                DexType::object("Ljava/lang/String;"),
                DexType::Array(Box::new(DexType::Int)),
            ],
            DexType::object("Ljava/lang/Object;"),
            3,
            vec![0x0138, 0x0004, 0x1007, 0x0228, 0x2007, 0x0011],
        );
        assign_types(&mut body, &SimplePool::default()).unwrap();
        let ret_block = body.block_at(5).unwrap();
        let ret = &body.block(ret_block).insns[0];
        assert_eq!(ret.reg_types[0], Some(DexType::object("Ljava/lang/Object;")));
    }

    #[test]
    fn reassignment_is_stable() {
        let mut body = build(
            vec![DexType::Int],
            DexType::Int,
            2,
            vec![0x0138, 0x0004, 0x0012, 0x0228, 0x1012, 0x000f],
        );
        let pool = SimplePool::default();
        assign_types(&mut body, &pool).unwrap();
        let first = all_reg_types(&body);
        assign_types(&mut body, &pool).unwrap();
        assert_eq!(first, all_reg_types(&body));
    }

    #[test]
    fn quiet_region_handler_is_typed() {
        // const/4 v0, #0; return-void; [2] const/4 v0, #1; return-void
        // Nothing in the region can throw, so the handler at 2 has no
        // incoming edges; its instructions still get types.
        let method = MethodDesc {
            owner: DexType::object("Lcom/example/Demo;"),
            name: "run".to_string(),
            return_type: DexType::Void,
            params: vec![],
            is_static: true,
        };
        let mut body = MethodBody::build(
            method,
            1,
            0,
            vec![0x0012, 0x000e, 0x1012, 0x000e],
            vec![TryRegion { start_pc: 0, end_pc: 2, handler_pc: 2, catch_type: None }],
            &SimplePool::default(),
        )
        .unwrap();
        assign_types(&mut body, &SimplePool::default()).unwrap();

        let handler = body.block_at(2).unwrap();
        assert!(body.block(handler).preds().is_empty());
        assert_eq!(body.block(handler).insns[0].reg_types[0], Some(DexType::Int));
    }

    #[test]
    fn return_object_checked_against_declaration() {
        // return-object v1 where v1 holds an int argument
        let mut body = build(
            vec![DexType::Int],
            DexType::object("Ljava/lang/String;"),
            2,
            vec![0x0111],
        );
        let e = assign_types(&mut body, &SimplePool::default()).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::TypeConflict);
    }

    #[test]
    fn throw_requires_a_throwable() {
        // throw v1 on an int argument
        let mut body = build(vec![DexType::Int], DexType::Void, 2, vec![0x0127]);
        let e = assign_types(&mut body, &SimplePool::default()).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::TypeConflict);
    }

    #[test]
    fn thrown_null_is_a_reference() {
        // const/4 v0, #0; throw v0 -- the constant resolves to a throwable
        let mut body = build(vec![], DexType::Void, 1, vec![0x0012, 0x0027]);
        assign_types(&mut body, &SimplePool::default()).unwrap();
        let insns = &body.block(body.entry()).insns;
        assert_eq!(insns[0].reg_types[0], Some(DexType::object(THROWABLE)));
    }

    #[test]
    fn monitor_needs_a_reference() {
        // monitor-enter v1 on an int argument
        let mut body = build(vec![DexType::Int], DexType::Void, 2, vec![0x011d, 0x000e]);
        let e = assign_types(&mut body, &SimplePool::default()).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::TypeConflict);
    }

    #[test]
    fn conflicting_use_is_rejected() {
        // neg-float v0, v1 on an int argument
        let mut body = build(vec![DexType::Int], DexType::Void, 2, vec![0x107f, 0x000e]);
        let e = assign_types(&mut body, &SimplePool::default()).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::TypeConflict);
    }

    #[test]
    fn loop_typing_converges() {
        // fresh placeholders on every visit must still reach a fixpoint
        let mut body = build(
            vec![],
            DexType::Void,
            1,
            vec![0x0012, 0x00d8, 0x0100, 0x003a, 0xfffe, 0x000e],
        );
        assign_types(&mut body, &SimplePool::default()).unwrap();
        let konst = &body.block(body.entry()).insns[0];
        assert_eq!(konst.reg_types[0], Some(DexType::Int));
    }
}
