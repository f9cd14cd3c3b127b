#[cfg(test)]
mod tests {
    use crate::dex::body::{MethodBody, TryRegion};
    use crate::dex::error::ErrorKind;
    use crate::dex::normalize::normalize_exceptions;
    use crate::types::{DexType, MethodDesc, SimplePool, ARITHMETIC, CLASS_CAST};

    fn method(params: Vec<DexType>, ret: DexType) -> MethodDesc {
        MethodDesc {
            owner: DexType::object("Lcom/example/Demo;"),
            name: "run".to_string(),
            return_type: ret,
            params,
            is_static: true,
        }
    }

    fn build(
        params: Vec<DexType>,
        ret: DexType,
        regs: u16,
        code: Vec<u16>,
        tries: Vec<TryRegion>,
    ) -> MethodBody {
        MethodBody::build(method(params, ret), regs, 0, code, tries, &SimplePool::default())
            .unwrap()
    }

    fn assert_single_entry(body: &MethodBody) {
        for region in body.tries.clone() {
            let members = body.region_blocks(&region);
            for &bid in members.iter().skip(1) {
                for p in body.block(bid).preds() {
                    assert!(members.contains(p), "predecessor outside region");
                }
            }
        }
    }

    fn assert_partition(body: &MethodBody) {
        let mut pc = 0;
        for &bid in body.order() {
            let bb = body.block(bid);
            if bb.is_relocated() {
                continue;
            }
            assert_eq!(bb.pc(), pc, "gap before {}", bb.name());
            pc = bb.end_pc();
        }
        assert_eq!(pc, body.code_len());
    }

    #[test]
    fn straight_line() {
        // const/16 v0, #5; add-int v0, v0, v1; return v0
        let body = build(
            vec![DexType::Int],
            DexType::Int,
            2,
            vec![0x0013, 0x0005, 0x0090, 0x0100, 0x000f],
            vec![],
        );
        assert_eq!(body.num_blocks(), 1);
        let entry = body.block(body.entry());
        assert_eq!(entry.name(), "entry");
        assert_eq!(entry.insns.len(), 3);
        assert!(entry.is_exit());
        assert!(entry.succs().is_empty());
        assert_partition(&body);
    }

    #[test]
    fn switch_edges() {
        // packed-switch v1 with three cases, each returning a constant,
        // default falling through to return 0
        let code = vec![
            0x012b, 0x000b, 0x0000, // 0: packed-switch v1, +11
            0x0012, 0x000f, // 3: const/4 v0, #0; return v0
            0x1012, 0x000f, // 5: const/4 v0, #1; return v0
            0x2012, 0x000f, // 7: const/4 v0, #2; return v0
            0x3012, 0x000f, // 9: const/4 v0, #3; return v0
            0x0100, 0x0003, 0x0000, 0x0000, // 11: table, 3 keys from 0
            0x0005, 0x0000, 0x0007, 0x0000, 0x0009, 0x0000,
        ];
        let body = build(vec![DexType::Int], DexType::Int, 2, code, vec![]);
        let entry = body.block(body.entry());
        assert_eq!(entry.succs().len(), 4);
        assert_eq!(entry.fallthrough(), body.block_at(3));
        assert_eq!(body.num_blocks(), 5);
        // the inline table stays attached to the last block
        let last = body.block(body.block_at(9).unwrap());
        assert_eq!(last.end_pc(), body.code_len());
        assert_partition(&body);
    }

    #[test]
    fn branch_into_instruction() {
        // goto +2 targets the second unit of the const/16
        let e = MethodBody::build(
            method(vec![], DexType::Void),
            1,
            0,
            vec![0x0228, 0x0013, 0x0005, 0x000e],
            vec![],
            &SimplePool::default(),
        )
        .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Structural);
    }

    #[test]
    fn falls_off_end() {
        let e = MethodBody::build(
            method(vec![], DexType::Void),
            1,
            0,
            vec![0x0012],
            vec![],
            &SimplePool::default(),
        )
        .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Structural);
    }

    #[test]
    fn unreachable_after_return() {
        let e = MethodBody::build(
            method(vec![], DexType::Void),
            1,
            0,
            vec![0x000e, 0x0012, 0x000e],
            vec![],
            &SimplePool::default(),
        )
        .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Structural);
    }

    #[test]
    fn too_few_registers() {
        let e = MethodBody::build(
            method(vec![DexType::Long], DexType::Void),
            1,
            0,
            vec![0x000e],
            vec![],
            &SimplePool::default(),
        )
        .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Structural);
    }

    // div-int v0, v1, v2 inside a try; return v0; handler returns -1
    fn guarded_div(catch: Option<DexType>) -> MethodBody {
        build(
            vec![DexType::Int, DexType::Int],
            DexType::Int,
            3,
            vec![0x0093, 0x0201, 0x000f, 0xf012, 0x000f],
            vec![TryRegion { start_pc: 0, end_pc: 2, handler_pc: 3, catch_type: catch }],
        )
    }

    #[test]
    fn exception_edge_when_catch_matches() {
        let body = guarded_div(Some(DexType::object(ARITHMETIC)));
        let entry = body.block(body.entry());
        let handler = body.block_at(3).unwrap();
        assert_eq!(entry.ex_succs(), &[handler]);
        assert!(body.block(handler).preds().contains(&body.entry()));
    }

    #[test]
    fn exception_edge_for_catch_all() {
        let body = guarded_div(None);
        assert_eq!(body.block(body.entry()).ex_succs().len(), 1);
    }

    #[test]
    fn no_exception_edge_for_unrelated_catch() {
        let body = guarded_div(Some(DexType::object(CLASS_CAST)));
        assert!(body.block(body.entry()).ex_succs().is_empty());
    }

    #[test]
    fn edge_kept_for_unknown_catch_class() {
        let body = guarded_div(Some(DexType::object("Lcom/example/MyError;")));
        assert_eq!(body.block(body.entry()).ex_succs().len(), 1);
    }

    #[test]
    fn handler_requires_block_start() {
        // handler pc 1 is the middle of the div-int
        let e = MethodBody::build(
            method(vec![DexType::Int, DexType::Int], DexType::Int),
            3,
            0,
            vec![0x0093, 0x0201, 0x000f, 0xf012, 0x000f],
            vec![TryRegion { start_pc: 0, end_pc: 2, handler_pc: 1, catch_type: None }],
            &SimplePool::default(),
        )
        .unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Structural);
    }

    #[test]
    fn relocation_out_of_region() {
        // const/4 v0, #0; goto 5; [2] const/4 v0, #1; return-void;
        // [4] const/4 v0, #2; goto 2
        // The block at pc 2 sits in the region but is only entered from
        // outside it, so normalization moves it behind everything else.
        let mut body = build(
            vec![],
            DexType::Void,
            1,
            vec![0x0012, 0x0428, 0x1012, 0x000e, 0x2012, 0xfd28],
            vec![TryRegion { start_pc: 0, end_pc: 4, handler_pc: 4, catch_type: None }],
        );
        normalize_exceptions(&mut body).unwrap();

        let moved = body.block_at(2).unwrap();
        assert!(body.block(moved).is_relocated());
        assert_eq!(*body.order().last().unwrap(), moved);

        // the region now contains only its entry block
        let members = body.region_blocks(&body.tries[0].clone());
        assert_eq!(members, vec![body.entry()]);
    }

    #[test]
    fn regions_stay_single_entry() {
        let mut body = build(
            vec![],
            DexType::Void,
            1,
            vec![0x0012, 0x0428, 0x1012, 0x000e, 0x2012, 0xfd28],
            vec![TryRegion { start_pc: 0, end_pc: 4, handler_pc: 4, catch_type: None }],
        );
        normalize_exceptions(&mut body).unwrap();
        assert_single_entry(&body);
    }

    #[test]
    fn region_extended_over_looping_tail() {
        // const/4 v0, #0; [1] add-int/lit8 v0, v0, #1; if-eqz v1, 6;
        // [5] return-void; [6] goto 1; [7] move-exception v0; return-void
        // The goto after the region jumps back into its middle; the block
        // at 6 cannot move (the loop needs it) so the region swallows it.
        let mut body = build(
            vec![DexType::Int],
            DexType::Void,
            2,
            vec![0x0012, 0x00d8, 0x0100, 0x0138, 0x0003, 0x000e, 0xfb28, 0x000d, 0x000e],
            vec![TryRegion { start_pc: 0, end_pc: 6, handler_pc: 7, catch_type: None }],
        );
        normalize_exceptions(&mut body).unwrap();
        assert_eq!(
            body.tries,
            vec![TryRegion { start_pc: 0, end_pc: 7, handler_pc: 7, catch_type: None }]
        );
        assert!(body.order().iter().all(|&b| !body.block(b).is_relocated()));
        assert_single_entry(&body);
    }

    #[test]
    fn region_split_at_branch_entry() {
        // if-eqz v1, 3; [2] const/4 v0, #0; [3] add-int/lit8 v0, v0, #1;
        // [5] return-void; [6] move-exception v0; return-void
        // The branch enters the region's second block, which neither moves
        // (it has a successor) nor extends (the intruder precedes the
        // region), so the region splits at the entered block.
        let mut body = build(
            vec![DexType::Int],
            DexType::Void,
            2,
            vec![0x0138, 0x0003, 0x0012, 0x00d8, 0x0100, 0x000e, 0x000d, 0x000e],
            vec![TryRegion { start_pc: 2, end_pc: 5, handler_pc: 6, catch_type: None }],
        );
        normalize_exceptions(&mut body).unwrap();
        assert_eq!(
            body.tries,
            vec![
                TryRegion { start_pc: 2, end_pc: 3, handler_pc: 6, catch_type: None },
                TryRegion { start_pc: 3, end_pc: 5, handler_pc: 6, catch_type: None },
            ]
        );
        assert_single_entry(&body);
    }

    #[test]
    fn end_block_synthesized() {
        // region runs to the end of the method, where no block starts
        let mut body = build(
            vec![DexType::Int, DexType::Int],
            DexType::Int,
            3,
            vec![0x0093, 0x0201, 0x000f],
            vec![TryRegion { start_pc: 0, end_pc: 3, handler_pc: 2, catch_type: None }],
        );
        normalize_exceptions(&mut body).unwrap();
        let end = body.block_at(3).unwrap();
        assert_eq!(body.block(end).name(), "final.0");
        assert!(body.block(end).insns.is_empty());
    }

    #[test]
    fn synthetic_goto_on_relocation() {
        // const/4 v0, #0; if-eqz v0, 4; [3] const/4 v0, #1; [4] return-void
        let mut body = build(
            vec![],
            DexType::Void,
            1,
            vec![0x0012, 0x0038, 0x0003, 0x1012, 0x000e],
            vec![],
        );
        let b1 = body.block_at(3).unwrap();
        let b0 = body.entry();
        assert_eq!(body.block(b1).fallthrough_pred(), Some(b0));

        body.move_to_end(b1);
        assert!(body.block(b1).is_relocated());
        assert_eq!(body.block(b0).fallthrough(), None);
        let filler = body.block(b0).insns.last().unwrap();
        assert!(filler.is_synthetic());
        assert!(filler.is_uncond_branch());
        assert_eq!(filler.target(), 3);
    }
}
