extern crate relbn;

use relbn::combine::{grouped_or_table, or_table};
use relbn::{Aggregator, CombiningRule, Domain, GroundKind, GroundNetwork, GroundingConfig, GroundingEngine,
            Initialization, MemoryDatabase, Network, NodeDecl, RelbnError, Signature, TemplateModel,
            TemplateModelBuilder, BOOLEAN};

use std::sync::Arc;


fn persons(db: &mut MemoryDatabase, names: &[&str]) {
    for n in names.iter() {
        db.add_object("Person", n);
    }
}

fn names(net: &GroundNetwork, name: &str) -> Vec<String> {
    net.parents_of(name).iter().map(|n| String::from(n.name())).collect()
}

/// smokes(X) is a noisy-or over the influences of all friends of X
fn smokers() -> TemplateModel {
    TemplateModelBuilder::new()
        .with_signature(Signature::new("influences", BOOLEAN, &["Person", "Person"]))
        .with_signature(Signature::new("friendOf", BOOLEAN, &["Person", "Person"]))
        .with_signature(Signature::new("smokes", BOOLEAN, &["Person"]))
        .evidence_function("friendOf")
        .evidence_function("smokes")
        .with_fragment(NodeDecl::new("influences", &["Y", "X"]), Initialization::Binomial(0.3))
        .with_node(NodeDecl::precondition("friendOf", &["X", "Y"]))
        .with_fragment(
            NodeDecl::new("smokes", &["X"])
                .parents(&["influences(Y,X)", "friendOf(X,Y)"])
                .aggregator(Aggregator::NoisyOr)
                .add_params(&["Y"]),
            Initialization::Random(11)
        )
        .build()
        .unwrap()
}

fn smokers_db() -> MemoryDatabase {
    let mut db = MemoryDatabase::new();
    persons(&mut db, &["a", "b", "c"]);
    db.set_value("friendOf", &["a", "b"], "True");
    db.set_value("friendOf", &["a", "c"], "True");
    db.set_value("friendOf", &["b", "c"], "False");
    db
}

#[test]
fn noisy_or_over_friends() {
    let model = smokers();
    let db = smokers_db();
    let net = GroundingEngine::new(&model, &db, &GroundingConfig::default()).ground().unwrap();

    // 9 influences, 2 auxiliary nodes and smokes(a); smokes(b) and smokes(c) are evidence
    assert_eq!(12, net.len());
    assert!(net.get("smokes(b)").is_none());
    assert!(net.get("smokes(c)").is_none());

    assert_eq!(vec!["AUX0_smokes(a)", "AUX1_smokes(a)"], names(&net, "smokes(a)"));
    assert_eq!(vec!["influences(b,a)"], names(&net, "AUX0_smokes(a)"));
    assert_eq!(vec!["influences(c,a)"], names(&net, "AUX1_smokes(a)"));

    let aux0 = net.get("AUX0_smokes(a)").unwrap();
    let aux1 = net.get("AUX1_smokes(a)").unwrap();
    assert_eq!(GroundKind::AggregatorAux, aux0.kind());
    assert_eq!(&[2, 2], aux0.cpf().shape());
    assert!(aux0.cpf().shares_values(aux1.cpf()));
    assert_eq!(Some("2{2=0}"), aux0.cpf_id());

    // the auxiliary tables are the template table with friendOf fixed to True
    let template = model.node(2).unwrap().cpt().unwrap();
    for &(x, i) in [(0, 0), (0, 1), (1, 0), (1, 1)].iter() {
        assert_eq!(template.value(&[x, i, 0]).unwrap(), aux0.cpf().value(&[x, i]).unwrap());
    }

    let smokes = net.get("smokes(a)").unwrap();
    assert_eq!(GroundKind::Atom, smokes.kind());
    assert_eq!(Some("OR-2"), smokes.cpf_id());
    assert_eq!(Some(2), smokes.template());
    assert_eq!(&or_table(2).unwrap(), &**smokes.cpf().values());

    // parents precede their children
    for idx in 0..net.num_nodes() {
        assert!(net.parent_indices(idx).iter().all(|&p| p < idx));
    }
}

#[test]
fn missing_friends_need_evidence() {
    let model = TemplateModelBuilder::new()
        .with_signature(Signature::new("influences", BOOLEAN, &["Person", "Person"]))
        .with_signature(Signature::new("friendOf", BOOLEAN, &["Person", "Person"]))
        .with_signature(Signature::new("smokes", BOOLEAN, &["Person"]))
        .with_fragment(NodeDecl::new("influences", &["Y", "X"]), Initialization::Binomial(0.3))
        .with_node(NodeDecl::precondition("friendOf", &["X", "Y"]))
        .with_fragment(
            NodeDecl::new("smokes", &["X"])
                .parents(&["influences(Y,X)", "friendOf(X,Y)"])
                .aggregator(Aggregator::NoisyOr)
                .add_params(&["Y"]),
            Initialization::Uniform
        )
        .build()
        .unwrap();
    let db = smokers_db();

    match GroundingEngine::new(&model, &db, &GroundingConfig::default()).ground() {
        Err(RelbnError::NoTemplateFound(name)) => assert_eq!("smokes(b)", name),
        _ => panic!("wrong result")
    };

    // the configuration can mark functions as evidence, too
    let config = GroundingConfig::from_toml("evidence_functions = [\"smokes\"]").unwrap();
    let net = GroundingEngine::new(&model, &db, &config).ground().unwrap();
    assert_eq!(12, net.len());
}

#[test]
fn disabled_cache_copies_tables() {
    let model = smokers();
    let db = smokers_db();
    let config = GroundingConfig { use_table_cache: false, ..GroundingConfig::default() };
    let net = GroundingEngine::new(&model, &db, &config).ground().unwrap();

    let aux0 = net.get("AUX0_smokes(a)").unwrap();
    let aux1 = net.get("AUX1_smokes(a)").unwrap();
    assert!(! aux0.cpf().shares_values(aux1.cpf()));
    assert_eq!(aux0.cpf().values(), aux1.cpf().values());
    assert_eq!(aux0.cpf_id(), aux1.cpf_id());
}

#[test]
fn constants_fix_coordinates() {
    let temps = Domain::new("Temperature", &["low", "high"]);

    // exceeds(S, maxTemp) holds iff the reading is high and the limit is low
    let table = relbn::Cpf::from_vec(&[2, 2, 2], vec![0., 0., 1., 0., 1., 1., 0., 1.]).unwrap();
    let model = TemplateModelBuilder::new()
        .with_signature(Signature::new("reading", "Temperature", &["Sensor"]))
        .with_signature(Signature::new("exceeds", BOOLEAN, &["Sensor", "Temperature"]))
        .with_fragment(NodeDecl::new("reading", &["S"]).domain(temps.clone()), Initialization::Multinomial(&[0.7, 0.3]))
        .with_node(NodeDecl::constant("maxTemp", temps))
        .with_fragment(
            NodeDecl::new("exceeds", &["S", "maxTemp"]).parents(&["reading(S)", "maxTemp()"]),
            Initialization::Table((**table.values()).clone())
        )
        .build()
        .unwrap();
    assert_eq!("maxTemp() -> Temperature", model.signatures().lookup("maxTemp").unwrap().to_string());

    let mut db = MemoryDatabase::new();
    db.add_object("Sensor", "s1");
    db.add_object("Temperature", "low");
    db.add_object("Temperature", "high");

    let net = GroundingEngine::new(&model, &db, &GroundingConfig::default()).ground().unwrap();
    assert_eq!(3, net.len());

    let low = net.get("exceeds(s1,low)").unwrap();
    assert_eq!(vec!["reading(s1)"], names(&net, "exceeds(s1,low)"));
    assert_eq!(Some("2{2=0}"), low.cpf_id());
    assert_eq!(1.0, low.cpf().value(&[0, 1]).unwrap());
    assert_eq!(0.0, low.cpf().value(&[0, 0]).unwrap());

    let high = net.get("exceeds(s1,high)").unwrap();
    assert_eq!(Some("2{2=1}"), high.cpf_id());
    assert_eq!(0.0, high.cpf().value(&[0, 1]).unwrap());
    assert_eq!(1.0, high.cpf().value(&[1, 1]).unwrap());
}

/// alarm(H) is caused by burglary(H) or by earthquake(H), described by two separate fragments
fn alarms() -> TemplateModelBuilder {
    TemplateModelBuilder::new()
        .with_signature(Signature::new("burglary", BOOLEAN, &["House"]))
        .with_signature(Signature::new("earthquake", BOOLEAN, &["House"]))
        .with_signature(Signature::new("alarm", BOOLEAN, &["House"]))
        .with_fragment(NodeDecl::new("burglary", &["H"]), Initialization::Binomial(0.1))
        .with_fragment(NodeDecl::new("earthquake", &["H"]), Initialization::Binomial(0.2))
}

fn houses() -> MemoryDatabase {
    let mut db = MemoryDatabase::new();
    db.add_object("House", "h");
    db
}

#[test]
fn noisy_or_combining_rule() {
    let by_burglary = relbn::Cpf::from_vec(&[2, 2], vec![0.9, 0.0, 0.1, 1.0]).unwrap();
    let by_quake = relbn::Cpf::from_vec(&[2, 2], vec![0.6, 0.0, 0.4, 1.0]).unwrap();
    let model = alarms()
        .with_fragment(
            NodeDecl::new("alarm", &["H"]).parents(&["burglary(H)"]),
            Initialization::Table((**by_burglary.values()).clone())
        )
        .with_named_fragment(
            "alarm by quake",
            NodeDecl::new("alarm", &["H"]).parents(&["earthquake(H)"]),
            Initialization::Table((**by_quake.values()).clone())
        )
        .build()
        .unwrap();
    let db = houses();

    let config = GroundingConfig::from_toml("[combining_rules]\nalarm = \"noisy-or\"").unwrap();
    let net = GroundingEngine::new(&model, &db, &config).ground().unwrap();

    assert_eq!(vec!["burglary(h)", "earthquake(h)"], names(&net, "alarm(h)"));
    let alarm = net.get("alarm(h)").unwrap();
    assert_eq!(None, alarm.cpf_id());
    assert_eq!(&[2, 2, 2], alarm.cpf().shape());
    assert!(alarm.cpf().is_normalized(1e-9));

    let p = alarm.cpf().value(&[0, 0, 0]).unwrap();
    assert!((p - (1.0 - 0.1 * 0.4)).abs() < 1e-9);
    assert!((alarm.cpf().value(&[0, 0, 1]).unwrap() - 0.9).abs() < 1e-9);
    assert!((alarm.cpf().value(&[0, 1, 0]).unwrap() - 0.6).abs() < 1e-9);
    assert_eq!(0.0, alarm.cpf().value(&[0, 1, 1]).unwrap());
    assert!((alarm.cpf().value(&[1, 0, 0]).unwrap() - 0.1 * 0.4).abs() < 1e-9);
}

#[test]
fn normalized_combining_rule() {
    let grades = Domain::new("Grade", &["a", "b", "c"]);
    let model = TemplateModelBuilder::new()
        .with_signature(Signature::new("grade", "Grade", &["Student"]))
        .with_signature(Signature::new("smart", BOOLEAN, &["Student"]))
        .with_fragment(NodeDecl::new("smart", &["S"]), Initialization::Binomial(0.5))
        .with_fragment(NodeDecl::new("grade", &["S"]).domain(grades.clone()), Initialization::Multinomial(&[0.2, 0.3, 0.5]))
        .with_named_fragment(
            "grade by smartness",
            NodeDecl::new("grade", &["S"]).domain(grades).parents(&["smart(S)"]),
            Initialization::Random(5)
        )
        .build()
        .unwrap();
    let mut db = MemoryDatabase::new();
    db.add_object("Student", "s");

    // noisy-or needs a boolean node
    let engine = GroundingEngine::new(&model, &db, &GroundingConfig::default())
        .with_combining_rule("grade", CombiningRule::NoisyOr);
    match engine.ground() {
        Err(RelbnError::NonBooleanAggregator(name)) => assert_eq!("grade(s)", name),
        _ => panic!("wrong result")
    };

    let engine = GroundingEngine::new(&model, &db, &GroundingConfig::default())
        .with_combining_rule("grade", CombiningRule::Average);
    let net = engine.ground().unwrap();
    let grade = net.get("grade(s)").unwrap();
    assert_eq!(&[3, 2], grade.cpf().shape());
    assert!(grade.cpf().is_normalized(1e-9));

    let by_smartness = model.node(2).unwrap().cpt().unwrap();
    let expected = (0.2 + by_smartness.value(&[0, 1]).unwrap()) / 2.0;
    assert!((grade.cpf().value(&[0, 1]).unwrap() - expected).abs() < 1e-9);
}

#[test]
fn degenerate_normalization() {
    let grades = Domain::new("Grade", &["a", "b", "c"]);
    let model = TemplateModelBuilder::new()
        .with_signature(Signature::new("grade", "Grade", &["Student"]))
        .with_fragment(NodeDecl::new("grade", &["S"]).domain(grades.clone()), Initialization::Multinomial(&[1.0, 0.0, 0.0]))
        .with_named_fragment(
            "grade again",
            NodeDecl::new("grade", &["S"]).domain(grades),
            Initialization::Multinomial(&[0.0, 0.0, 1.0])
        )
        .build()
        .unwrap();
    let mut db = MemoryDatabase::new();
    db.add_object("Student", "s");

    let engine = GroundingEngine::new(&model, &db, &GroundingConfig::default())
        .with_combining_rule("grade", CombiningRule::Min);
    match engine.ground() {
        Err(RelbnError::DegenerateNormalization(name)) => assert_eq!("grade(s)", name),
        _ => panic!("wrong result")
    };

    let engine = GroundingEngine::new(&model, &db, &GroundingConfig::default())
        .with_combining_rule("grade", CombiningRule::Max);
    let net = engine.ground().unwrap();
    let grade = net.get("grade(s)").unwrap();
    assert_eq!(0.5, grade.cpf().value(&[0]).unwrap());
    assert_eq!(0.0, grade.cpf().value(&[1]).unwrap());
    assert_eq!(0.5, grade.cpf().value(&[2]).unwrap());
}

#[test]
fn functional_or_links_parents() {
    // reached(X) holds iff some edge(Y,X) and marked(Y) both hold
    let model = TemplateModelBuilder::new()
        .with_signature(Signature::new("edge", BOOLEAN, &["Person", "Person"]))
        .with_signature(Signature::new("marked", BOOLEAN, &["Person"]))
        .with_signature(Signature::new("reached", BOOLEAN, &["Person"]))
        .with_fragment(NodeDecl::new("edge", &["Y", "X"]), Initialization::Binomial(0.5))
        .with_fragment(NodeDecl::new("marked", &["Y"]), Initialization::Binomial(0.5))
        .with_fragment(
            NodeDecl::new("reached", &["X"])
                .parents(&["edge(Y,X)", "marked(Y)"])
                .aggregator(Aggregator::FunctionalOr)
                .add_params(&["Y"]),
            Initialization::Uniform
        )
        .build()
        .unwrap();
    let mut db = MemoryDatabase::new();
    persons(&mut db, &["a", "b"]);

    let net = GroundingEngine::new(&model, &db, &GroundingConfig::default()).ground().unwrap();

    // 4 edges, 2 marks, 2 reached and no auxiliary nodes
    assert_eq!(8, net.len());
    assert_eq!(
        vec!["edge(a,a)", "marked(a)", "edge(b,a)", "marked(b)"],
        names(&net, "reached(a)")
    );

    let reached = net.get("reached(a)").unwrap();
    assert_eq!(Some("=OR-2-2"), reached.cpf_id());
    assert_eq!(&grouped_or_table(4, 2).unwrap(), &**reached.cpf().values());

    // both nodes have the same structure
    let other = net.get("reached(b)").unwrap();
    assert!(Arc::ptr_eq(reached.cpf().values(), other.cpf().values()));
}

#[test]
fn guessed_signatures() {
    let model = TemplateModelBuilder::new()
        .guess_signatures()
        .with_fragment(NodeDecl::new("p", &["X"]), Initialization::Binomial(0.5))
        .build()
        .unwrap();
    let mut db = MemoryDatabase::new();
    db.add_object("ObjType_X", "x1");
    db.add_object("ObjType_X", "x2");

    let net = GroundingEngine::new(&model, &db, &GroundingConfig::default()).ground().unwrap();
    assert_eq!(2, net.len());
    assert!(net.get("p(x2)").is_some());
}

#[test]
fn evidence_with_constraints() {
    use relbn::{GroundNode, GroundingHooks, TemplateNode};

    struct Exclusive {
        added: usize
    }

    impl GroundingHooks for Exclusive {
        fn on_ground_atom_added(&mut self, _template: &TemplateNode, _args: &[String], _node: &GroundNode) {
            self.added += 1;
        }

        fn ground_auxiliary_constraints(&mut self, _model: &TemplateModel, network: &mut GroundNetwork) -> relbn::Result<()> {
            let atoms = vec![String::from("burglary(h)"), String::from("earthquake(h)")];
            network.add_hard_constraint_node("exclusive(h)", &atoms)?;
            Ok(())
        }
    }

    let model = alarms().build().unwrap();
    let db = houses();
    let mut hooks = Exclusive { added: 0 };
    let net = GroundingEngine::new(&model, &db, &GroundingConfig::default()).ground_with(&mut hooks).unwrap();

    assert_eq!(2, hooks.added);
    assert_eq!(3, net.len());
    let exclusive = net.get("exclusive(h)").unwrap();
    assert_eq!(GroundKind::HardConstraint, exclusive.kind());

    let evidence = net.full_evidence(&[(String::from("burglary(h)"), String::from("False"))]).unwrap();
    assert_eq!(vec![Some(1), None, Some(0)], evidence);

    match net.full_evidence(&[(String::from("burglary(h)"), String::from("maybe"))]) {
        Err(RelbnError::UnknownValue(_, _)) => assert!(true),
        _ => panic!("wrong result")
    };
}
