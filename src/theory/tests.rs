use super::*;

fn leaves(ids: &[u32]) -> Vec<Statement> {
    ids.iter().map(|&id| Statement::leaf(Variable::boolean(id))).collect()
}

fn compound(id: u32, ids: Vec<u32>, bias: i64) -> Statement {
    Statement::compound(Variable::boolean(id), AtLeast::new(ids, bias))
}

/// `4 = (0 ∧ 1) ∨ 2` with the conjunction as its own statement 3.
fn nested_theory() -> Theory {
    let mut statements = leaves(&[0, 1, 2]);
    statements.push(compound(3, vec![0, 1], -2));
    statements.push(compound(4, vec![3, 2], -1));
    Theory::new("nested", statements)
}

/// Two roots, a fold that only partly succeeds, and a negated proposition.
fn mixed_theory() -> Theory {
    let mut statements = leaves(&[0, 1, 2, 3]);
    statements.push(compound(4, vec![0, 1], -2));
    statements.push(compound(5, vec![2, 3], -1));
    statements.push(compound(6, vec![0, 2, 3], -2));
    statements.push(compound(7, vec![4, 5], -1));
    statements.push(compound(8, vec![7, 6], -2));
    statements.push(Statement::compound(
        Variable::boolean(9),
        AtLeast::with_sign(vec![1, 2], 1, Sign::Negative),
    ));
    Theory::new("mixed", statements)
}

/// `4 = 3 ∨ y` over `3 = 0 ∨ 1`, where `y` ranges over `[-2, 2]`.
fn integer_leaf_theory() -> Theory {
    let mut statements = leaves(&[0, 1]);
    statements.push(Statement::leaf(Variable::new(2, (-2, 2))));
    statements.push(compound(3, vec![0, 1], -1));
    statements.push(compound(4, vec![3, 2], -1));
    Theory::new("integer-leaf", statements)
}

/// An integer leaf `y` in `[-1, 2]` under a compound, an at-most child folded into
/// a disjunction, and ids listed twice in one expression. Roots are 7 and 8.
fn bounded_theory() -> Theory {
    let mut statements = leaves(&[0, 1]);
    statements.push(Statement::leaf(Variable::new(2, (-1, 2))));
    statements.push(Statement::compound(
        Variable::boolean(3),
        AtLeast::with_sign(vec![0, 1], 1, Sign::Negative),
    ));
    statements.push(compound(4, vec![2], -1));
    statements.push(compound(5, vec![3, 4], -1));
    statements.push(compound(6, vec![0, 0, 1], -2));
    statements.push(compound(7, vec![5, 6], -2));
    statements.push(compound(8, vec![6, 6], -1));
    Theory::new("bounded", statements)
}

fn coefficient_map(lineq: &GeLineq) -> HashMap<u32, i64> {
    lineq
        .indices
        .iter()
        .copied()
        .zip(lineq.coeffs.iter().copied())
        .collect()
}

/// Every compound variable implies its expression and every root is set.
fn theory_holds(theory: &Theory, values: &HashMap<u32, i64>) -> bool {
    let implications = theory.statements.iter().all(|s| match &s.expression {
        Some(expression) => {
            values[&s.variable.id] == 0 || expression.evaluate(values) == Some(true)
        }
        None => true,
    });
    implications && theory.roots().iter().all(|root| values[root] == 1)
}

/// Compiles `theory` in active mode and checks that the polyhedron admits exactly
/// the theory's models. Every integer point of the column bounds is tried, with
/// absorbed statements (children first) set to the truth of their expression.
fn assert_models_match(theory: &Theory, reduced: bool) {
    let compiled = Compiler::new(theory).unwrap().compile(true, reduced).unwrap();
    let absorbed = compiled.eliminated.clone();
    let polyhedron = compiled.into_polyhedron().unwrap();
    let variables = theory.variable_map();
    let columns: Vec<u32> = polyhedron.variables.iter().map(|v| v.id).collect();

    let mut points: Vec<HashMap<u32, i64>> = vec![HashMap::new()];
    for id in &columns {
        let (lo, hi) = variables[id].bounds;
        points = points
            .into_iter()
            .flat_map(|point| {
                (lo..=hi).map(move |value| {
                    let mut extended = point.clone();
                    extended.insert(*id, value);
                    extended
                })
            })
            .collect();
    }

    for mut values in points {
        for id in &absorbed {
            let statement = theory
                .statements
                .iter()
                .find(|s| s.variable.id == *id)
                .unwrap();
            let truth = statement.expression.as_ref().unwrap().evaluate(&values).unwrap();
            values.insert(*id, i64::from(truth));
        }
        let point: Vec<f64> = columns.iter().map(|id| values[id] as f64).collect();
        assert_eq!(
            polyhedron.is_satisfied_by(&point).unwrap(),
            theory_holds(theory, &values),
            "disagreement at {:?}",
            values
        );
    }
}

#[test]
fn test_validate_rejects_duplicate_ids() {
    let mut statements = leaves(&[0, 1]);
    statements.push(Statement::leaf(Variable::boolean(1)));
    let result = Theory::new("dup", statements).validate();
    assert!(matches!(result, Err(PuanError::DuplicateVariable(1))));
}

#[test]
fn test_validate_rejects_unknown_reference() {
    let mut statements = leaves(&[0]);
    statements.push(compound(1, vec![0, 7], -1));
    let result = Theory::new("unknown", statements).validate();
    assert!(matches!(result, Err(PuanError::UnknownVariable(7))));
}

#[test]
fn test_validate_rejects_cycles() {
    let statements = vec![compound(0, vec![1], -1), compound(1, vec![0], -1)];
    let result = Theory::new("cycle", statements).validate();
    assert!(matches!(result, Err(PuanError::CyclicTheory(_))));
}

#[test]
fn test_validate_rejects_non_boolean_compound() {
    let statements = vec![
        Statement::leaf(Variable::boolean(0)),
        Statement::compound(Variable::new(1, (0, 3)), AtLeast::new(vec![0], -1)),
    ];
    let result = Theory::new("int", statements).validate();
    assert!(matches!(result, Err(PuanError::NonBooleanCompound(1))));
}

#[test]
fn test_validate_rejects_crossed_bounds() {
    let statements = vec![Statement::leaf(Variable::new(0, (2, 1)))];
    let result = Theory::new("bounds", statements).validate();
    assert!(matches!(result, Err(PuanError::InvalidBounds(_, _, 0))));
}

#[test]
fn test_shared_children_are_not_a_cycle() {
    let mut statements = leaves(&[0, 1]);
    statements.push(compound(2, vec![0, 1], -1));
    statements.push(compound(3, vec![0, 1], -2));
    statements.push(compound(4, vec![2, 3], -1));
    assert!(Theory::new("diamond", statements).validate().is_ok());
}

#[test]
fn test_roots() {
    assert_eq!(nested_theory().roots(), vec![4]);
    assert_eq!(mixed_theory().roots(), vec![8, 9]);
    // A lone leaf is not a root.
    assert!(Theory::new("leaf", leaves(&[0])).roots().is_empty());
}

#[test]
fn test_at_least_classification() {
    assert!(AtLeast::new(vec![0, 1], -1).is_disjunction());
    assert!(AtLeast::new(vec![0, 1], -2).is_conjunction());
    assert!(!AtLeast::new(vec![0, 1, 2], -2).is_conjunction());
    assert!(!AtLeast::with_sign(vec![0, 1], -1, Sign::Negative).is_disjunction());
    // A single id is both.
    let single = AtLeast::new(vec![0], -1);
    assert!(single.is_disjunction() && single.is_conjunction());
}

#[test]
fn test_negative_sign_reads_at_most() {
    let at_most_one = AtLeast::with_sign(vec![0, 1], 1, Sign::Negative);
    let values = |a, b| -> HashMap<u32, i64> { [(0, a), (1, b)].into_iter().collect() };
    assert_eq!(at_most_one.evaluate(&values(1, 0)), Some(true));
    assert_eq!(at_most_one.evaluate(&values(1, 1)), Some(false));
    assert_eq!(at_most_one.evaluate(&[(0, 1)].into_iter().collect()), None);
}

#[test]
fn test_to_lineqs_unreduced() {
    let lineqs = nested_theory().to_lineqs(false, false).unwrap();
    assert_eq!(lineqs.len(), 2);

    // x3 → x0 + x1 >= 2
    assert_eq!(lineqs[0].id, Some(3));
    assert_eq!(lineqs[0].bias, 0);
    assert_eq!(
        coefficient_map(&lineqs[0]),
        [(3, -2), (0, 1), (1, 1)].into_iter().collect()
    );

    // x4 → x3 + x2 >= 1
    assert_eq!(lineqs[1].id, Some(4));
    assert_eq!(lineqs[1].bias, 0);
    assert_eq!(
        coefficient_map(&lineqs[1]),
        [(4, -1), (3, 1), (2, 1)].into_iter().collect()
    );
}

#[test]
fn test_to_lineqs_reduced_and_active() {
    let lineqs = nested_theory().to_lineqs(true, true).unwrap();
    assert_eq!(lineqs.len(), 2);

    // x4 → x0 + x1 + 2·x2 >= 2
    assert_eq!(lineqs[0].id, Some(4));
    assert_eq!(lineqs[0].bias, 0);
    assert_eq!(
        coefficient_map(&lineqs[0]),
        [(4, -2), (2, 2), (0, 1), (1, 1)].into_iter().collect()
    );

    assert_eq!(lineqs[1], GeLineq::literal(&Variable::boolean(4)));
}

#[test]
fn test_polyhedron_drops_absorbed_columns() {
    let theory = nested_theory();
    let full = theory.to_ge_polyhedron(true, false).unwrap();
    let reduced = theory.to_ge_polyhedron(true, true).unwrap();

    let ids = |ph: &Polyhedron| ph.variables.iter().map(|v| v.id).collect::<Vec<_>>();
    assert_eq!(ids(&full), vec![0, 1, 2, 3, 4]);
    assert_eq!(ids(&reduced), vec![0, 1, 2, 4]);
    assert_eq!(reduced.index, vec![Some(4), None]);
    assert_eq!(reduced.b, vec![0.0, 1.0]);
    assert_eq!(reduced.a.row(0), &[1.0, 1.0, 2.0, -2.0]);
}

#[test]
fn test_reduced_polyhedron_keeps_the_models() {
    let theory = nested_theory();
    assert_models_match(&theory, false);
    assert_models_match(&theory, true);
}

#[test]
fn test_failed_fold_keeps_parent_expression() {
    let theory = mixed_theory();
    let compiled = Compiler::new(&theory).unwrap().compile(true, true).unwrap();
    // 4 and 5 fold into 7, but 7 ∧ 6 has no single-inequality form.
    assert_eq!(compiled.eliminated, vec![4, 5]);
    let ids: Vec<Option<u32>> = compiled.lineqs.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![Some(6), Some(7), Some(8), Some(9), None, None]);
    assert_eq!(
        coefficient_map(&compiled.lineqs[2]),
        [(8, -2), (7, 1), (6, 1)].into_iter().collect()
    );

    assert_models_match(&theory, false);
    assert_models_match(&theory, true);
}

#[test]
fn test_shared_child_is_not_absorbed() {
    let mut statements = leaves(&[0, 1]);
    statements.push(compound(2, vec![0, 1], -2));
    statements.push(compound(3, vec![2, 0], -1));
    statements.push(compound(4, vec![2, 3], -2));
    let theory = Theory::new("shared", statements);
    let reduced = theory.to_ge_polyhedron(true, true).unwrap();
    let ids: Vec<u32> = reduced.variables.iter().map(|v| v.id).collect();
    // 2 is referenced twice; 3 is absorbed into 4.
    assert_eq!(ids, vec![0, 1, 2, 4]);
    assert_models_match(&theory, true);
}

#[test]
fn test_integer_child_blocks_the_fold() {
    let theory = integer_leaf_theory();
    let compiled = Compiler::new(&theory).unwrap().compile(true, true).unwrap();
    // y is not 0/1, so `x3 + y >= 1` is not a disjunction and 3 stays.
    assert!(compiled.eliminated.is_empty());
    assert_eq!(
        theory.to_lineqs(true, true).unwrap(),
        theory.to_lineqs(true, false).unwrap()
    );
    assert_models_match(&theory, false);
    assert_models_match(&theory, true);
}

#[test]
fn test_integer_child_solves_alike_reduced_or_not() {
    let theory = integer_leaf_theory();
    let lowest_y: HashMap<u32, f64> = [(2, -1.0)].into_iter().collect();
    for reduced in [false, true] {
        let solution = &theory.solve(vec![lowest_y.clone()], reduced).unwrap()[0];
        assert_eq!(solution.status_code, 5);
        assert_eq!(solution.z, 0);
        assert_eq!(&solution.x[2..], &[0, 1, 1]);
        assert!(solution.x[0] + solution.x[1] >= 1);
    }
}

#[test]
fn test_bounded_theory_keeps_the_models() {
    let theory = bounded_theory();
    let compiled = Compiler::new(&theory).unwrap().compile(true, true).unwrap();
    // 3 and 4 fold into 5, which folds into 7 next to the literal of 6.
    assert_eq!(compiled.eliminated, vec![3, 4, 5]);
    assert_models_match(&theory, false);
    assert_models_match(&theory, true);
}

#[test]
fn test_bounded_theory_solves_alike_reduced_or_not() {
    let theory = bounded_theory();
    let lowest_y: HashMap<u32, f64> = [(2, -1.0)].into_iter().collect();
    for reduced in [false, true] {
        let solution = &theory.solve(vec![lowest_y.clone()], reduced).unwrap()[0];
        assert_eq!(solution.status_code, 5);
        // y = -1 needs "at most one of 0, 1", and 6 needs x0.
        assert_eq!(solution.x, vec![1, 0, -1, 1, 0, 1, 1, 1, 1]);
        assert_eq!(solution.z, 1);
    }
}

#[test]
fn test_solve_fills_in_absorbed_variables() {
    let theory = nested_theory();
    let cheapest: HashMap<u32, f64> = [(0, -1.0), (1, -1.0), (2, -1.0)].into_iter().collect();
    let everything: HashMap<u32, f64> = [(0, 1.0), (1, 1.0), (2, 1.0)].into_iter().collect();

    let reduced = theory.solve(vec![cheapest.clone(), everything], true).unwrap();
    assert_eq!(reduced[0].x, vec![0, 0, 1, 0, 1]);
    assert_eq!(reduced[0].z, -1);
    assert_eq!(reduced[0].status_code, 5);
    // 3 is absorbed, so it reports the truth of x0 ∧ x1.
    assert_eq!(reduced[1].x, vec![1, 1, 1, 1, 1]);
    assert_eq!(reduced[1].z, 3);

    let full = theory.solve(vec![cheapest], false).unwrap();
    assert_eq!(full[0].x, vec![0, 0, 1, 0, 1]);
    assert_eq!(full[0].z, -1);
}

#[test]
fn test_solve_weights_on_absorbed_variables_only_enter_z() {
    let theory = nested_theory();
    let objective: HashMap<u32, f64> = [(2, -1.0), (3, 5.0)].into_iter().collect();
    let solutions = theory.solve(vec![objective], true).unwrap();
    // x2 = 0 forces x0 = x1 = 1, which makes x3 true.
    assert_eq!(solutions[0].x, vec![1, 1, 0, 1, 1]);
    assert_eq!(solutions[0].z, 5);
}

#[test]
fn test_solve_infeasible_theory() {
    let mut statements = leaves(&[0]);
    statements.push(compound(1, vec![0], -1));
    statements.push(Statement::compound(
        Variable::boolean(2),
        AtLeast::with_sign(vec![0], 0, Sign::Negative),
    ));
    statements.push(compound(3, vec![1, 2], -2));
    let theory = Theory::new("contradiction", statements);
    let solutions = theory.solve(vec![HashMap::new()], true).unwrap();
    assert_eq!(solutions[0].status_code, 3);
    assert!(solutions[0].x.is_empty());
    assert_eq!(solutions[0].z, 0);
}

#[test]
fn test_json_round_trip_and_defaults() {
    let theory = mixed_theory();
    let json = theory.to_json().unwrap();
    assert_eq!(Theory::from_json(&json).unwrap(), theory);

    let minimal = r#"{ "statements": [
        { "variable": { "id": 0, "bounds": [0, 1] } },
        { "variable": { "id": 1, "bounds": [0, 1] }, "expression": { "ids": [0], "bias": -1 } }
    ] }"#;
    let parsed = Theory::from_json(minimal).unwrap();
    assert_eq!(parsed.id, "");
    assert_eq!(parsed.statements[1].expression.as_ref().unwrap().sign, Sign::Positive);
}

#[test]
fn test_from_json_validates() {
    let cyclic = r#"{ "id": "c", "statements": [
        { "variable": { "id": 0, "bounds": [0, 1] }, "expression": { "ids": [0], "bias": -1 } }
    ] }"#;
    assert!(matches!(Theory::from_json(cyclic), Err(PuanError::CyclicTheory(0))));
    assert!(matches!(Theory::from_json("[]"), Err(PuanError::SerdeJson(_))));
}
