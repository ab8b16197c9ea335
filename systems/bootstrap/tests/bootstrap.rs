use sorting_board_core::{ConfigError, ExportConfig, LevelConfig, WELCOME_BANNER};
use sorting_board_system_bootstrap::{Bootstrap, SetupError};

fn offline() -> LevelConfig {
    LevelConfig {
        export: ExportConfig {
            enabled: false,
            ..ExportConfig::default()
        },
        ..LevelConfig::default()
    }
}

#[test]
fn default_level_prepares_a_world() {
    let bootstrap = Bootstrap;
    let world = bootstrap.prepare(offline()).expect("default level is valid");
    assert_eq!(bootstrap.welcome_banner(&world), WELCOME_BANNER);
    assert_eq!(bootstrap.holes(&world).len(), 3);
}

#[test]
fn missing_holes_block_setup() {
    let bootstrap = Bootstrap;
    let config = LevelConfig {
        holes: Vec::new(),
        ..offline()
    };
    assert_eq!(
        bootstrap.prepare(config).err(),
        Some(SetupError::Config(ConfigError::MissingHoles))
    );
}

#[test]
fn enabled_export_requires_a_directory() {
    let bootstrap = Bootstrap;
    assert_eq!(
        bootstrap.prepare(LevelConfig::default()).err(),
        Some(SetupError::MissingExportDirectory)
    );
}
