use std::collections::BTreeSet;
use std::path::PathBuf;

use fieldrules::{FieldRulesError, Key, Request, Schema, TypeRegistry};
use tracing_subscriber::EnvFilter;

fn setup() -> Schema {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/archive.rules");
    Schema::load(path, TypeRegistry::with_builtins()).expect("fixture parses")
}

fn key(text: &str) -> Key {
    text.parse().expect("key parses")
}

fn leaf_keywords(schema: &Schema, leaf: fieldrules::RuleId) -> Vec<String> {
    schema
        .rule(leaf)
        .unwrap()
        .predicates()
        .iter()
        .map(|p| p.keyword().to_string())
        .collect()
}

#[test]
fn climate_dates_canonicalize_but_keep_raw_values() {
    let schema = setup();
    let probe = key("param=167,date=20210427,step=0,class=od,expver=1,stream=dacl,domain=g,type=em,levtype=sfc");
    let mut full = None;
    let leaf = schema
        .expand(&probe, &mut |_: &Key, f: &Key| {
            full = Some(f.clone());
            true
        })
        .unwrap();
    assert_eq!(leaf_keywords(&schema, leaf), vec!["step", "date", "param"]);

    let full = full.unwrap();
    assert_eq!(full.rule(), Some(leaf));
    assert_eq!(full.get("date").unwrap(), "20210427");
    assert_eq!(full.canonical_value(&schema, "date").unwrap(), "0427");
    assert!(full.matches(&schema, "date", &BTreeSet::from(["0427".to_string()])).unwrap());
    assert!(!full.matches(&schema, "date", &BTreeSet::from(["20210427".to_string()])).unwrap());
    assert_eq!(full.canonical_value(&schema, "expver").unwrap(), "0001");
    assert_eq!(
        full.values_to_string(&schema).unwrap(),
        "od:0001:dacl:g:em:sfc:0:0427:167"
    );
}

#[test]
fn steps_lose_leading_zeros_and_quantiles_stay() {
    let schema = setup();
    let probe = key("class=od,expver=1,stream=dacl,domain=g,type=pb,levtype=sfc,step=02-12,quantile=99:100,param=228");
    let mut expanded = None;
    schema
        .expand(&probe, &mut |e: &Key, _: &Key| {
            expanded = Some(e.clone());
            true
        })
        .unwrap();
    let expanded = expanded.unwrap();
    assert!(expanded.is_canonical());
    assert_eq!(expanded.get("step").unwrap(), "2-12");
    assert_eq!(expanded.get("quantile").unwrap(), "99:100");
}

#[test]
fn raw_keys_use_the_type_block_until_a_rule_is_attached() {
    let schema = setup();
    let mut raw = key("param=167,step=06,time=6,date=20210427,class=od,expver=1,stream=oper,type=fc,levtype=sfc");
    assert_eq!(raw.rule(), None);
    assert!(!raw.is_canonical());
    assert_eq!(raw.canonical_value(&schema, "time").unwrap(), "0600");
    assert_eq!(raw.canonical_value(&schema, "expver").unwrap(), "0001");
    assert_eq!(raw.canonical_value(&schema, "step").unwrap(), "6");
    assert_eq!(
        raw.values_to_string(&schema).unwrap(),
        "167:6:0600:20210427:od:0001:oper:fc:sfc"
    );

    let leaf = schema.rule_for(&raw).unwrap().unwrap();
    raw.set_rule(leaf);
    // domain and levelist are on the rule path but absent from the key.
    assert_eq!(
        raw.values_to_string(&schema).unwrap(),
        "od:0001:oper:20210427:0600:fc:sfc:6:167"
    );
    assert_eq!(raw.get("time").unwrap(), "6");
}

#[test]
fn inline_types_apply_only_once_the_rule_is_known() {
    let schema = setup();
    let mut raw = key("class=od,expver=1,stream=dacl,domain=g,type=em,levtype=sfc,step=0,date=20210427,param=167");
    assert_eq!(raw.canonical_value(&schema, "date").unwrap(), "20210427");
    let leaf = schema.rule_for(&raw).unwrap().unwrap();
    raw.set_rule(leaf);
    assert_eq!(raw.canonical_value(&schema, "date").unwrap(), "0427");
}

#[test]
fn unset_keywords_are_missing_not_empty() {
    let schema = setup();
    let probe = key("class=od");
    match probe.canonical_value(&schema, "date") {
        Err(FieldRulesError::MissingKeyword(k)) => assert_eq!(k, "date"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(Key::new().values_to_string(&schema).unwrap(), "");
}

#[test]
fn optional_defaults_are_filled_and_shown() {
    let schema = setup();
    let probe = key("class=od,expver=1,stream=oper,date=20210427,time=12,type=fc,levtype=sfc,step=6,param=167");
    let mut seen = Vec::new();
    schema
        .expand(&probe, &mut |e: &Key, f: &Key| {
            seen.push((e.clone(), f.clone()));
            true
        })
        .unwrap();
    let (expanded, full) = &seen[0];
    assert_eq!(full.get("domain").unwrap(), "g");
    assert_eq!(full.get("levelist").unwrap(), "");
    assert_eq!(expanded.get("time").unwrap(), "1200");
    assert_eq!(
        expanded.values_to_string(&schema).unwrap(),
        "od:0001:oper:20210427:1200:g:fc:sfc:6::167"
    );
}

#[test]
fn hidden_keywords_are_matched_but_not_shown() {
    let schema = setup();
    let probe = key("class=od,expver=1,stream=enfo,date=20210427,time=0,domain=g,type=pf,levtype=pl,step=24,levelist=500,param=130");
    let mut seen = Vec::new();
    let leaf = schema
        .expand(&probe, &mut |e: &Key, f: &Key| {
            seen.push((e.clone(), f.clone()));
            true
        })
        .unwrap();
    assert!(leaf_keywords(&schema, leaf).contains(&"number".to_string()));
    let (expanded, full) = &seen[0];
    assert_eq!(full.get("number").unwrap(), "0");
    assert!(!expanded.contains("number"));
    assert_eq!(
        expanded.values_to_string(&schema).unwrap(),
        "od:0001:enfo:20210427:0000:g:pf:pl:24::500:130"
    );
}

#[test]
fn first_declared_rule_wins_and_is_stable() {
    let schema = setup();
    let probe = key("class=od,expver=1,stream=enfo,date=20210427,time=0,domain=g,type=cf,levtype=sfc,step=0,param=167");
    let first = schema.rule_for(&probe).unwrap().unwrap();
    for _ in 0..5 {
        assert_eq!(schema.rule_for(&probe).unwrap(), Some(first));
    }
    // Ensemble is declared before the catch-all, which would accept the key too.
    let ensemble_root = schema.roots()[3];
    assert_eq!(schema.forest().ancestry(first).last(), Some(&ensemble_root));
}

#[test]
fn rejected_leaves_fall_through_to_later_rules() {
    let schema = setup();
    let probe = key("class=od,expver=1,stream=enfo,date=20210427,time=0,domain=g,type=cf,levtype=sfc,step=0,param=167");
    let mut calls = 0;
    let leaf = schema
        .expand(&probe, &mut |_: &Key, _: &Key| {
            calls += 1;
            calls > 1
        })
        .unwrap();
    assert_eq!(calls, 2);
    let catch_all = schema.roots()[4];
    assert_eq!(schema.forest().ancestry(leaf).last(), Some(&catch_all));
}

#[test]
fn keys_outside_the_schema_are_reported() {
    let schema = Schema::parse("[ class=od [ param ] ]", TypeRegistry::new()).unwrap();
    let probe = key("class=rd,param=130");
    match schema.expand(&probe, &mut |_: &Key, _: &Key| true) {
        Err(FieldRulesError::NoMatchingRule { key }) => assert_eq!(key, "{class=rd,param=130}"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(schema.rule_for(&probe).unwrap(), None);
}

#[test]
fn literals_compare_against_canonical_values() {
    let schema = Schema::parse("step:Step;\n[ step=6, param ]", TypeRegistry::with_builtins()).unwrap();
    assert!(schema.rule_for(&key("step=006,param=1")).unwrap().is_some());
    match schema.rule_for(&key("step=x-,param=1")) {
        Err(FieldRulesError::Canonicalization { keyword, value, .. }) => {
            assert_eq!(keyword, "step");
            assert_eq!(value, "x-");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn requests_fan_out_over_every_accepting_rule() {
    let schema = setup();
    let request: Request = "class=od,expver=1,stream=oper,date=20210427/20210428,time=0/12,type=fc,levtype=sfc,step=0/6,param=167"
        .parse()
        .unwrap();
    let mut visited = Vec::new();
    let visits = schema
        .expand_request(&request, &mut |e: &Key, f: &Key| {
            visited.push((e.values_to_string(&schema).unwrap(), f.rule().unwrap()));
            true
        })
        .unwrap();
    // Eight combinations under the operational rule, eight more under the catch-all.
    assert_eq!(visits, 16);
    assert_eq!(visited.len(), 16);
    assert_eq!(visited[0].0, "od:0001:oper:20210427:0000:g:fc:sfc:0::167");
    assert_eq!(visited[1].0, "od:0001:oper:20210427:0000:g:fc:sfc:6::167");
    assert_eq!(visited[7].0, "od:0001:oper:20210428:1200:g:fc:sfc:6::167");
    assert_eq!(visited[8].0, "od:0001:oper:20210427:0000:fc:sfc:0::167");
    assert!(visited[..8].iter().all(|(_, leaf)| *leaf == visited[0].1));
}

#[test]
fn fan_out_stops_when_the_visitor_says_so() {
    let schema = setup();
    let request: Request = "class=od,expver=1,stream=oper,date=20210427,time=0,type=fc,levtype=sfc,step=0/6/12,param=167"
        .parse()
        .unwrap();
    let mut count = 0;
    let visits = schema
        .expand_request(&request, &mut |_: &Key, _: &Key| {
            count += 1;
            count < 2
        })
        .unwrap();
    assert_eq!(visits, 2);

    let nothing: Request = "class=od,stream=unknown".parse().unwrap();
    let empty = Schema::parse("[ class, stream=oper ]", TypeRegistry::new()).unwrap();
    assert!(matches!(
        empty.expand_request(&nothing, &mut |_: &Key, _: &Key| true),
        Err(FieldRulesError::NoMatchingRule { .. })
    ));
}

#[test]
fn schema_is_shared_across_threads() {
    let schema = setup();
    let probe = key("class=od,expver=1,stream=oper,date=20210427,time=12,type=fc,levtype=sfc,step=6,param=167");
    let expected = schema.rule_for(&probe).unwrap();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| assert_eq!(schema.rule_for(&probe).unwrap(), expected));
        }
    });
}
