use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use physim::{build_simulator, ConfigError, Scenario, ScenarioConfig, Solver};

fn parse(yaml: &str) -> ScenarioConfig {
    serde_yaml::from_str(yaml).expect("scenario yaml should parse")
}

fn load(file_name: &str) -> ScenarioConfig {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name);
    let file = File::open(&path).expect("scenario file should exist");
    serde_yaml::from_reader(BufReader::new(file)).expect("scenario file should parse")
}

// ==================================================================================
// Parsing
// ==================================================================================

#[test]
fn scenario_defaults_from_empty_document() {
    let cfg = parse("{}");
    assert_eq!(cfg.simulator.dt, 0.01);
    assert_eq!(cfg.simulator.solver, Solver::EulerSemi);
    assert_eq!(cfg.simulator.viscous_drag, 0.05);
    assert_eq!(cfg.run.steps, 100);
    assert_eq!(cfg.run.threads, 1);
    assert!(cfg.geometry.is_empty());

    let sim = build_simulator(&cfg).expect("defaults are valid");
    assert!(sim.free_particles().is_empty());
    assert!(sim.fields().is_empty(), "no gravity unless configured");
}

#[test]
fn scenario_full_document_builds() {
    let cfg = parse(
        r#"
simulator:
  dt: 0.002
  solver: "verlet"
  viscous_drag: 0.0
  particle_collisions: true
  gravity: [0.0, -9.81, 0.0]
  seed: 3
emitters:
  free:
    source: { type: "rect", origin: [-1.0, 5.0, -1.0], u: [1.0, 0.0, 0.0], v: [0.0, 0.0, 1.0], width: 2.0, height: 2.0 }
    lifetime: 4.0
  sized:
    source: { type: "hose", origin: [0.0, 2.0, 0.0], axis: [0.0, 0.0, 2.0], radius: 0.3, length: 1.0 }
    radius: 0.1
particles:
  free: 10
  sized: 3
  agents:
    - pos: [1.0, 0.5, 0.0]
      target: [-1.0, 0.5, 0.0]
      radius: 0.2
      max_speed: 1.0
      max_force: 2.0
geometry:
  - type: "plane"
    normal: [0.0, 1.0, 0.0]
    point: [0.0, 0.0, 0.0]
  - type: "sphere"
    center: [0.0, 1.0, 0.0]
    radius: 0.5
  - type: "triangle"
    vertices: [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]
  - type: "rectangle"
    vertices: [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]]
run:
  steps: 20
  threads: 2
"#,
    );
    let mut scenario = Scenario::build_scenario(&cfg).expect("valid scenario");
    let sim = &mut scenario.simulator;
    assert_eq!(sim.solver(), Solver::Verlet);
    assert!(sim.particle_particle_collisions());
    assert_eq!(sim.free_particles().len(), 10);
    assert_eq!(sim.sized_particles().len(), 3);
    assert_eq!(sim.agent_particles().len(), 1);
    assert_eq!(sim.geometry().len(), 4);
    assert_eq!(sim.fields().len(), 1);
    assert!(sim.sized_particles().iter().all(|s| s.radius == 0.1));
    assert!(sim.free_particles().iter().all(|p| p.lifetime == 4.0 && p.cur_pos.y == 5.0));

    for _ in 0..scenario.steps {
        scenario.simulator.apply_time_step_parallel(scenario.threads);
    }
    let all_finite = scenario
        .simulator
        .free_particles()
        .iter()
        .all(|p| p.cur_pos.iter().all(|c| c.is_finite()));
    assert!(all_finite, "scenario produced non-finite positions");
}

#[test]
fn scenario_shipped_files_build() {
    for file in ["falling_particles.yaml", "ramp.yaml"] {
        let cfg = load(file);
        let scenario = Scenario::build_scenario(&cfg);
        assert!(scenario.is_ok(), "{} failed: {:?}", file, scenario.err());
    }
}

#[test]
fn scenario_unknown_geometry_type_is_a_parse_error() {
    let res: Result<ScenarioConfig, _> = serde_yaml::from_str("geometry:\n  - type: \"torus\"\n    radius: 1.0\n");
    assert!(res.is_err());
}

// ==================================================================================
// Validation
// ==================================================================================

#[test]
fn scenario_rejects_negative_time_step() {
    let cfg = parse("simulator:\n  dt: -0.1\n");
    assert_eq!(build_simulator(&cfg).err(), Some(ConfigError::InvalidTimeStep { dt: -0.1 }));
}

#[test]
fn scenario_rejects_negative_drag() {
    let cfg = parse("simulator:\n  viscous_drag: -1.0\n");
    assert!(matches!(build_simulator(&cfg), Err(ConfigError::NegativeDrag { .. })));
}

#[test]
fn scenario_rejects_degenerate_geometry() {
    let cfg = parse(
        r#"
geometry:
  - type: "plane"
    normal: [0.0, 1.0, 0.0]
    point: [0.0, 0.0, 0.0]
  - type: "triangle"
    vertices: [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]
"#,
    );
    assert_eq!(
        build_simulator(&cfg).err(),
        Some(ConfigError::DegenerateGeometry { index: 1, kind: "triangle" })
    );

    let cfg = parse("geometry:\n  - type: \"sphere\"\n    center: [0.0, 0.0, 0.0]\n    radius: 0.0\n");
    assert!(matches!(build_simulator(&cfg), Err(ConfigError::DegenerateGeometry { index: 0, .. })));
}

#[test]
fn scenario_rejects_object_with_missing_vertex() {
    let cfg = parse(
        r#"
geometry:
  - type: "object"
    vertices: [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]
    triangles: [[0, 1, 5]]
"#,
    );
    assert_eq!(
        build_simulator(&cfg).err(),
        Some(ConfigError::InvalidObject { index: 0, vertex: 5, count: 3 })
    );
}

#[test]
fn scenario_rejects_bad_emitter_and_agent() {
    let cfg = parse("emitters:\n  sized:\n    radius: -0.5\n");
    assert!(matches!(build_simulator(&cfg), Err(ConfigError::InvalidEmitter { which: "sized", .. })));

    let cfg = parse(
        "emitters:\n  free:\n    source: { type: \"hose\", origin: [0.0, 0.0, 0.0], axis: [0.0, 0.0, 0.0], radius: 1.0, length: 1.0 }\n",
    );
    assert!(matches!(build_simulator(&cfg), Err(ConfigError::InvalidEmitter { which: "free", .. })));

    let cfg = parse(
        "particles:\n  agents:\n    - pos: [0.0, 0.0, 0.0]\n      target: [1.0, 0.0, 0.0]\n      mass: 0.0\n      max_speed: 1.0\n      max_force: 1.0\n",
    );
    assert!(matches!(build_simulator(&cfg), Err(ConfigError::InvalidAgent { index: 0, .. })));
}
