use std::error::Error;
use std::rc::Rc;

use trajcompute::{
    CollisionPolicy, Compute, ComputeError, ComputeRegistry, DensityProfileOptions, Instruction,
    Operation, RecordingEngine, RegistryConfig, Trajectory,
};

fn setup() -> (Rc<RecordingEngine>, Trajectory) {
    let engine = Rc::new(RecordingEngine::new());
    let trajectory = Trajectory::new(engine.clone(), engine.open_trajectory("registry"));
    (engine, trajectory)
}

fn rejecting() -> ComputeRegistry {
    ComputeRegistry::with_config(RegistryConfig {
        collision_policy: CollisionPolicy::Reject,
    })
}

#[test]
fn test_automatic_names_increase() -> Result<(), Box<dyn Error>> {
    let (_engine, trajectory) = setup();
    let mut registry = ComputeRegistry::new();

    let names: Vec<String> = (0..3)
        .map(|_| {
            registry
                .density(&trajectory, DensityProfileOptions::new())
                .map(|p| p.name().to_string())
        })
        .collect::<Result<_, _>>()?;

    assert_eq!(names, vec!["0", "1", "2"]);
    assert_eq!(registry.counter(), 3);
    assert_eq!(trajectory.compute_names(), vec!["0", "1", "2"]);
    Ok(())
}

#[test]
fn test_explicit_names_do_not_advance_counter() -> Result<(), Box<dyn Error>> {
    let (_engine, trajectory) = setup();
    let mut registry = ComputeRegistry::new();

    let first = registry.density(&trajectory, DensityProfileOptions::new())?;
    let named = registry.density(&trajectory, DensityProfileOptions::new().name("water"))?;
    let second = registry.density(&trajectory, DensityProfileOptions::new())?;

    assert_eq!(first.name(), "0");
    assert_eq!(named.name(), "water");
    assert_eq!(second.name(), "1");
    Ok(())
}

#[test]
fn test_registries_do_not_share_counters() -> Result<(), Box<dyn Error>> {
    let (engine, trajectory) = setup();
    let other = Trajectory::new(engine.clone(), engine.open_trajectory("other"));

    let mut first = ComputeRegistry::new();
    let mut second = ComputeRegistry::new();
    first.density(&trajectory, DensityProfileOptions::new())?;
    first.density(&trajectory, DensityProfileOptions::new())?;

    let profile = second.density(&other, DensityProfileOptions::new())?;
    assert_eq!(profile.name(), "0");
    Ok(())
}

#[test]
fn test_overwrite_policy_replaces_registration() -> Result<(), Box<dyn Error>> {
    let (engine, trajectory) = setup();
    let mut registry = ComputeRegistry::new();
    assert_eq!(registry.collision_policy(), CollisionPolicy::Overwrite);

    let first = registry.density(&trajectory, DensityProfileOptions::new().name("rho"))?;
    let second = registry.density(&trajectory, DensityProfileOptions::new().name("rho"))?;

    let replaced = second.descriptor().accumulator();
    assert_ne!(first.descriptor().accumulator(), replaced);
    assert_eq!(trajectory.accumulator("rho"), Some(replaced));
    assert_eq!(
        engine.registered(trajectory.handle()),
        vec![("rho".to_string(), replaced)]
    );
    Ok(())
}

#[test]
fn test_reject_policy_fails_before_engine_calls() -> Result<(), Box<dyn Error>> {
    let (engine, trajectory) = setup();
    let mut registry = rejecting();

    let first = registry.density(&trajectory, DensityProfileOptions::new().name("rho"))?;
    let before = engine.instructions().len();

    let err = registry
        .density(&trajectory, DensityProfileOptions::new().name("rho"))
        .unwrap_err();
    assert!(matches!(err, ComputeError::NameCollision(ref name) if name == "rho"));
    assert_eq!(engine.instructions().len(), before);
    assert_eq!(
        trajectory.accumulator("rho"),
        Some(first.descriptor().accumulator())
    );
    Ok(())
}

#[test]
fn test_reject_policy_applies_to_automatic_names() -> Result<(), Box<dyn Error>> {
    let (_engine, trajectory) = setup();
    let mut registry = rejecting();

    registry.density(&trajectory, DensityProfileOptions::new().name("0"))?;
    let err = registry
        .density(&trajectory, DensityProfileOptions::new())
        .unwrap_err();
    assert!(matches!(err, ComputeError::NameCollision(_)));

    // The consumed name is not handed out again
    let next = registry.density(&trajectory, DensityProfileOptions::new())?;
    assert_eq!(next.name(), "1");
    Ok(())
}

#[test]
fn test_reject_policy_allows_rebuilding_in_place() -> Result<(), Box<dyn Error>> {
    let (engine, trajectory) = setup();
    let mut registry = rejecting();

    let mut profile = registry.density(&trajectory, DensityProfileOptions::new().types(["O"]))?;
    profile.construct(&trajectory)?;
    assert_eq!(
        trajectory.accumulator("0"),
        Some(profile.descriptor().accumulator())
    );

    // Another compute holding the name on the target trajectory still collides
    let other = Trajectory::new(engine.clone(), engine.open_trajectory("other"));
    registry.density(&other, DensityProfileOptions::new().name("0"))?;
    assert!(matches!(
        profile.construct(&other),
        Err(ComputeError::NameCollision(_))
    ));
    Ok(())
}

#[test]
fn test_reject_policy_allows_moving_back() -> Result<(), Box<dyn Error>> {
    let (engine, first) = setup();
    let second = Trajectory::new(engine.clone(), engine.open_trajectory("second"));
    let mut registry = rejecting();

    let mut profile = registry.density(&first, DensityProfileOptions::new().types(["O"]))?;
    let original = profile.descriptor().accumulator();

    profile.construct(&second)?;
    assert!(!first.has_compute("0"));
    assert!(engine.registered(first.handle()).is_empty());
    assert_eq!(
        engine.instructions().last(),
        Some(&Instruction::UnregisterCompute {
            trajectory: first.handle(),
            accumulator: original,
            name: "0".to_string(),
        })
    );

    profile.construct(&first)?;
    let live = profile.descriptor().accumulator();
    assert_eq!(first.accumulator("0"), Some(live));
    assert!(second.compute_names().is_empty());
    assert_eq!(
        engine.registered(first.handle()),
        vec![("0".to_string(), live)]
    );
    Ok(())
}

#[test]
fn test_moving_leaves_overwriting_compute_registered() -> Result<(), Box<dyn Error>> {
    let (engine, first) = setup();
    let second = Trajectory::new(engine.clone(), engine.open_trajectory("second"));
    let mut registry = ComputeRegistry::new();

    let mut moved = registry.density(&first, DensityProfileOptions::new().name("rho"))?;
    let kept = registry.density(&first, DensityProfileOptions::new().name("rho"))?;

    moved.construct(&second)?;
    assert_eq!(first.accumulator("rho"), Some(kept.descriptor().accumulator()));
    assert_eq!(
        engine.registered(first.handle()),
        vec![("rho".to_string(), kept.descriptor().accumulator())]
    );
    assert_eq!(second.accumulator("rho"), Some(moved.descriptor().accumulator()));
    Ok(())
}

#[test]
fn test_failed_unregister_keeps_binding() -> Result<(), Box<dyn Error>> {
    let (engine, first) = setup();
    let second = Trajectory::new(engine.clone(), engine.open_trajectory("second"));
    let mut registry = rejecting();

    let mut profile = registry.density(&first, DensityProfileOptions::new())?;
    let original = profile.descriptor().accumulator();

    engine.fail_on(Operation::Unregister);
    assert!(matches!(
        profile.construct(&second),
        Err(ComputeError::Engine(_))
    ));
    assert_eq!(profile.descriptor().accumulator(), original);
    assert!(profile
        .descriptor()
        .trajectory()
        .is_some_and(|t| t.ptr_eq(&first)));
    assert_eq!(first.accumulator("0"), Some(original));
    Ok(())
}

#[test]
fn test_registry_config_from_toml() -> Result<(), Box<dyn Error>> {
    let config: RegistryConfig = toml::from_str("collision_policy = \"reject\"")?;
    assert_eq!(config.collision_policy, CollisionPolicy::Reject);

    let config: RegistryConfig = toml::from_str("")?;
    assert_eq!(config, RegistryConfig::default());

    // Misspelled keys are reported, not ignored
    assert!(toml::from_str::<RegistryConfig>("colision_policy = \"reject\"").is_err());
    Ok(())
}
