mod decode_tests;
mod cfg_tests;
mod analysis_tests;
mod retarget_tests;

#[cfg(test)]
mod tests {
    use crate::types::{DexType, MethodDesc, MethodRef, ARITHMETIC, CLASS_CAST, THROWABLE};

    #[test]
    fn descriptors() {
        assert_eq!(DexType::from_descriptor("I"), Some(DexType::Int));
        let arr = DexType::from_descriptor("[[J").unwrap();
        assert_eq!(arr.descriptor(), "[[J");
        assert_eq!(arr.words(), 1);
        let s = DexType::from_descriptor("Ljava/lang/String;").unwrap();
        assert_eq!(s.internal_name().unwrap(), "java/lang/String");
        assert_eq!(DexType::from_descriptor("Ljava/lang/String"), None);
        assert_eq!(DexType::from_descriptor("II"), None);
        assert_eq!(DexType::from_descriptor(""), None);
    }

    #[test]
    fn subtyping() {
        let arith = DexType::object(ARITHMETIC);
        let throwable = DexType::object(THROWABLE);
        let cast = DexType::object(CLASS_CAST);
        assert_eq!(arith.subtype_of(&throwable), Some(true));
        assert_eq!(arith.subtype_of(&cast), Some(false));
        assert_eq!(throwable.subtype_of(&arith), Some(false));
        // Application classes are outside the known hierarchy
        let unknown = DexType::object("Lcom/example/Oops;");
        assert_eq!(unknown.subtype_of(&throwable), None);
        assert_eq!(unknown.subtype_of(&DexType::object("Ljava/lang/Object;")), Some(true));
    }

    #[test]
    fn calling_parameters() {
        let m = MethodRef {
            owner: DexType::object("LExample;"),
            name: "f".to_string(),
            return_type: DexType::Long,
            params: vec![DexType::Int, DexType::Long],
        };
        assert_eq!(m.descriptor(), "(IJ)J");
        assert_eq!(m.num_calling_params(true), 3);
        assert_eq!(m.calling_param(0, true), &DexType::object("LExample;"));
        assert_eq!(m.calling_param(2, true), &DexType::Long);
        assert_eq!(m.calling_param(0, false), &DexType::Int);
    }

    #[test]
    fn method_signatures() {
        let m = MethodDesc {
            owner: DexType::object("LExample;"),
            name: "f".to_string(),
            return_type: DexType::Void,
            params: vec![DexType::Long, DexType::Int],
            is_static: false,
        };
        assert_eq!(m.in_words(), 4);
        assert_eq!(m.signature(), "LExample;->f(JI)V");
        assert_eq!(m.calling_param(0), &DexType::object("LExample;"));
    }
}
