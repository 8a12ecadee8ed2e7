use bevy::prelude::*;
use garage::{CarDef, GarageStore, StoreError};

use arcade_racer::session::{AppMode, Garage, RaceEntity, RaceStatus};
use arcade_racer::telemetry::{HudTelemetry, LapClock, display_kph};

pub struct GarageUiPlugin;

impl Plugin for GarageUiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GarageView>()
            .add_systems(OnEnter(AppMode::Garage), spawn_garage_screen)
            .add_systems(OnExit(AppMode::Garage), despawn_garage_screen)
            .add_systems(
                Update,
                (handle_garage_buttons, rebuild_garage_panel)
                    .chain()
                    .run_if(in_state(AppMode::Garage)),
            )
            .add_systems(OnEnter(AppMode::Race), spawn_hud)
            .add_systems(
                Update,
                (update_hud, show_race_error).run_if(in_state(AppMode::Race)),
            );
    }
}

/// Garage screen state that is not part of the save.
#[derive(Resource, Default)]
struct GarageView {
    dealer_open: bool,
    status: String,
}

#[derive(Component)]
struct GarageScreen;
#[derive(Component)]
struct GaragePanel;
#[derive(Component)]
struct SpeedText;
#[derive(Component)]
struct RpmText;
#[derive(Component)]
struct GearText;
#[derive(Component)]
struct LapTimeText;
#[derive(Component)]
struct RaceErrorPanel;

#[derive(Component, Debug, Clone, PartialEq)]
enum GarageAction {
    BuyCar(String),
    SellCar(String),
    SelectCar(String),
    BuyUpgrade { car: String, upgrade: String },
    ToggleDealer,
    StartRace,
}

const PANEL_BG: Color = Color::srgba(0.08, 0.08, 0.12, 0.92);
const ROW_BG: Color = Color::srgba(0.15, 0.15, 0.2, 0.8);
const BTN_BG: Color = Color::srgb(0.25, 0.25, 0.35);
const DISABLED_BG: Color = Color::srgb(0.18, 0.18, 0.2);
const SELECTED_BG: Color = Color::srgb(0.2, 0.5, 0.7);
const START_BG: Color = Color::srgb(0.15, 0.55, 0.2);
const SELL_BG: Color = Color::srgb(0.55, 0.15, 0.15);
const TEXT_COLOR: Color = Color::srgb(0.9, 0.9, 0.9);
const LABEL_COLOR: Color = Color::srgb(0.7, 0.7, 0.7);
const CREDITS_COLOR: Color = Color::srgb(1.0, 0.85, 0.3);

fn px(val: f32) -> Val {
    Val::Px(val)
}

fn text_font(size: f32) -> TextFont {
    TextFont {
        font_size: size,
        ..default()
    }
}

fn row_style() -> Node {
    Node {
        flex_direction: FlexDirection::Row,
        align_items: AlignItems::Center,
        column_gap: px(4.0),
        padding: UiRect::axes(px(4.0), px(2.0)),
        ..default()
    }
}

fn spawn_button(parent: &mut ChildSpawnerCommands, action: GarageAction, label: &str, bg: Color) {
    parent
        .spawn((
            Button,
            action,
            Node {
                padding: UiRect::axes(px(8.0), px(3.0)),
                margin: UiRect::all(px(2.0)),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            BackgroundColor(bg),
        ))
        .with_children(|btn| {
            btn.spawn((Text::new(label), text_font(13.0), TextColor(TEXT_COLOR)));
        });
}

fn spawn_garage_screen(mut commands: Commands, mut view: ResMut<GarageView>) {
    commands.spawn((GarageScreen, Camera2d));
    commands.spawn((
        GarageScreen,
        GaragePanel,
        Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            flex_direction: FlexDirection::Column,
            padding: UiRect::all(px(16.0)),
            row_gap: px(8.0),
            overflow: Overflow::scroll_y(),
            ..default()
        },
        BackgroundColor(PANEL_BG),
    ));
    // Force a rebuild of the panel contents.
    view.set_changed();
}

fn despawn_garage_screen(mut commands: Commands, screen: Query<Entity, With<GarageScreen>>) {
    for entity in &screen {
        commands.entity(entity).despawn();
    }
}

fn handle_garage_buttons(
    buttons: Query<(&Interaction, &GarageAction), Changed<Interaction>>,
    mut garage: ResMut<Garage>,
    mut view: ResMut<GarageView>,
    mut next_mode: ResMut<NextState<AppMode>>,
) {
    for (interaction, action) in &buttons {
        if *interaction != Interaction::Pressed {
            continue;
        }
        match action {
            GarageAction::ToggleDealer => {
                view.dealer_open = !view.dealer_open;
                view.status.clear();
            }
            GarageAction::StartRace => {
                if garage.store.active_car().is_some() {
                    next_mode.set(AppMode::Race);
                } else {
                    view.status = "Buy a car at the dealer first".to_string();
                }
            }
            _ => {
                view.status = match apply_action(&mut garage.store, action) {
                    Ok(message) => {
                        garage.persist();
                        message
                    }
                    Err(error) => {
                        warn!("garage action failed: {error}");
                        error.to_string()
                    }
                };
            }
        }
    }
}

/// Apply a store mutation and describe the outcome for the status line.
fn apply_action(store: &mut GarageStore, action: &GarageAction) -> Result<String, StoreError> {
    match action {
        GarageAction::BuyCar(def_id) => {
            let color = store
                .catalog()
                .car(def_id)
                .map(|def| def.color.clone())
                .unwrap_or_default();
            store.buy_car(def_id, &color)?;
            Ok(format!("Bought {}", car_name(store, def_id)))
        }
        GarageAction::SellCar(instance_id) => {
            let value = store.sell_car(instance_id)?;
            Ok(format!("Sold for {value} CR"))
        }
        GarageAction::SelectCar(instance_id) => {
            store.select_car(instance_id);
            Ok(String::new())
        }
        GarageAction::BuyUpgrade { car, upgrade } => {
            store.buy_upgrade(car, upgrade)?;
            let name = store
                .catalog()
                .upgrade(upgrade)
                .map(|u| u.name.clone())
                .unwrap_or_else(|| upgrade.clone());
            Ok(format!("Installed {name}"))
        }
        GarageAction::ToggleDealer | GarageAction::StartRace => Ok(String::new()),
    }
}

fn car_name(store: &GarageStore, def_id: &str) -> String {
    store
        .catalog()
        .car(def_id)
        .map(|def| def.name.clone())
        .unwrap_or_else(|| def_id.to_string())
}

fn rebuild_garage_panel(
    mut commands: Commands,
    garage: Res<Garage>,
    view: Res<GarageView>,
    panel: Query<Entity, With<GaragePanel>>,
) {
    if !garage.is_changed() && !view.is_changed() {
        return;
    }
    let Ok(panel) = panel.single() else {
        return;
    };
    let store = &garage.store;

    commands.entity(panel).despawn_children();
    commands.entity(panel).with_children(|panel| {
        panel
            .spawn(row_style())
            .with_children(|header| {
                let title = if view.dealer_open { "Dealer" } else { "Garage" };
                header.spawn((
                    Text::new(title),
                    text_font(26.0),
                    TextColor(TEXT_COLOR),
                    Node {
                        flex_grow: 1.0,
                        ..default()
                    },
                ));
                header.spawn((
                    Text::new(format!("{} CR", store.credits())),
                    text_font(20.0),
                    TextColor(CREDITS_COLOR),
                ));
                let toggle = if view.dealer_open {
                    "Back to Garage"
                } else {
                    "Visit Dealer"
                };
                spawn_button(header, GarageAction::ToggleDealer, toggle, BTN_BG);
            });

        if !view.status.is_empty() {
            panel.spawn((
                Text::new(view.status.clone()),
                text_font(14.0),
                TextColor(LABEL_COLOR),
            ));
        }

        if view.dealer_open {
            dealer_rows(panel, store);
        } else {
            garage_rows(panel, store);
        }
    });
}

fn dealer_rows(panel: &mut ChildSpawnerCommands, store: &GarageStore) {
    for def in &store.catalog().cars {
        let affordable = store.credits() >= def.price;
        panel
            .spawn((row_style(), BackgroundColor(ROW_BG)))
            .with_children(|row| {
                row.spawn((
                    Text::new(dealer_line(def)),
                    text_font(14.0),
                    TextColor(TEXT_COLOR),
                    Node {
                        flex_grow: 1.0,
                        ..default()
                    },
                ));
                let bg = if affordable { START_BG } else { DISABLED_BG };
                spawn_button(row, GarageAction::BuyCar(def.id.clone()), "Buy", bg);
            });
    }
}

fn dealer_line(def: &CarDef) -> String {
    format!(
        "[{}] {}  {} CR  |  {:.0} HP  {}  {:.0} kg",
        def.mesh_type.label(),
        def.name,
        def.price,
        def.base_stats.horsepower,
        def.drive_train.label(),
        def.base_stats.weight
    )
}

fn garage_rows(panel: &mut ChildSpawnerCommands, store: &GarageStore) {
    panel.spawn((Text::new("Owned Cars"), text_font(16.0), TextColor(LABEL_COLOR)));

    if store.state().owned_cars.is_empty() {
        panel.spawn((
            Text::new("Your garage is empty. Visit the dealer."),
            text_font(14.0),
            TextColor(TEXT_COLOR),
        ));
        return;
    }

    let active_id = store.active_car().map(|car| car.instance_id.clone());
    for car in &store.state().owned_cars {
        let is_active = active_id.as_deref() == Some(car.instance_id.as_str());
        let name = car_name(store, &car.def_id);
        panel
            .spawn((row_style(), BackgroundColor(ROW_BG)))
            .with_children(|row| {
                row.spawn((
                    Text::new(format!("{name}  ({} upgrades)", car.upgrades.len())),
                    text_font(14.0),
                    TextColor(TEXT_COLOR),
                    Node {
                        flex_grow: 1.0,
                        ..default()
                    },
                ));
                let (label, bg) = if is_active {
                    ("Selected", SELECTED_BG)
                } else {
                    ("Select", BTN_BG)
                };
                spawn_button(row, GarageAction::SelectCar(car.instance_id.clone()), label, bg);
                spawn_button(row, GarageAction::SellCar(car.instance_id.clone()), "Sell", SELL_BG);
            });
    }

    let Some(active) = store.active_car() else {
        return;
    };
    let stats = store.car_stats(&active.instance_id);
    panel.spawn((Text::new("Stats"), text_font(16.0), TextColor(LABEL_COLOR)));
    panel.spawn((
        Text::new(format!(
            "{:.0} HP  |  {:.0} N·m  |  {:.0} kg  |  grip {:.2}  |  {:.0} km/h top",
            stats.horsepower, stats.torque, stats.weight, stats.grip, stats.top_speed
        )),
        text_font(14.0),
        TextColor(TEXT_COLOR),
    ));

    panel.spawn((Text::new("Upgrades"), text_font(16.0), TextColor(LABEL_COLOR)));
    for upgrade in &store.catalog().upgrades {
        let installed = active.upgrades.iter().any(|u| u == &upgrade.id);
        panel
            .spawn((row_style(), BackgroundColor(ROW_BG)))
            .with_children(|row| {
                row.spawn((
                    Text::new(format!("{} (tier {})", upgrade.name, upgrade.tier)),
                    text_font(14.0),
                    TextColor(TEXT_COLOR),
                    Node {
                        flex_grow: 1.0,
                        ..default()
                    },
                ));
                if installed {
                    row.spawn((Text::new("Installed"), text_font(13.0), TextColor(LABEL_COLOR)));
                } else {
                    let bg = if store.credits() >= upgrade.cost {
                        BTN_BG
                    } else {
                        DISABLED_BG
                    };
                    spawn_button(
                        row,
                        GarageAction::BuyUpgrade {
                            car: active.instance_id.clone(),
                            upgrade: upgrade.id.clone(),
                        },
                        &format!("{} CR", upgrade.cost),
                        bg,
                    );
                }
            });
    }

    panel
        .spawn(Node {
            margin: UiRect::top(px(12.0)),
            ..default()
        })
        .with_children(|row| {
            spawn_button(row, GarageAction::StartRace, "Race", START_BG);
        });
}

fn spawn_hud(mut commands: Commands) {
    commands
        .spawn((
            RaceEntity,
            Node {
                position_type: PositionType::Absolute,
                left: px(20.0),
                bottom: px(20.0),
                flex_direction: FlexDirection::Column,
                padding: UiRect::all(px(10.0)),
                row_gap: px(4.0),
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.55)),
        ))
        .with_children(|hud| {
            hud.spawn((Text::new("0 KM/H"), SpeedText, text_font(32.0), TextColor(TEXT_COLOR)));
            hud.spawn((Text::new("0 RPM"), RpmText, text_font(16.0), TextColor(LABEL_COLOR)));
            hud.spawn((Text::new("GEAR 1"), GearText, text_font(16.0), TextColor(LABEL_COLOR)));
        });

    commands
        .spawn((
            RaceEntity,
            Node {
                position_type: PositionType::Absolute,
                top: px(20.0),
                width: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                align_items: AlignItems::Center,
                ..default()
            },
        ))
        .with_children(|top| {
            top.spawn((Text::new("0.0"), LapTimeText, text_font(28.0), TextColor(TEXT_COLOR)));
            top.spawn((
                Text::new("PRESS ESC TO EXIT"),
                text_font(12.0),
                TextColor(LABEL_COLOR),
            ));
        });
}

fn update_hud(
    hud: Res<HudTelemetry>,
    clock: Res<LapClock>,
    mut speed: Query<&mut Text, (With<SpeedText>, Without<RpmText>, Without<GearText>, Without<LapTimeText>)>,
    mut rpm: Query<&mut Text, (With<RpmText>, Without<GearText>, Without<LapTimeText>)>,
    mut gear: Query<&mut Text, (With<GearText>, Without<LapTimeText>)>,
    mut lap: Query<&mut Text, With<LapTimeText>>,
) {
    let sample = hud.0;
    for mut text in &mut speed {
        text.0 = format!("{} KM/H", display_kph(sample.speed));
    }
    for mut text in &mut rpm {
        text.0 = format!("{:.0} RPM", sample.rpm);
    }
    for mut text in &mut gear {
        text.0 = format!("GEAR {}", sample.gear);
    }
    for mut text in &mut lap {
        text.0 = clock.label();
    }
}

fn show_race_error(
    mut commands: Commands,
    status: Res<RaceStatus>,
    existing: Query<(), With<RaceErrorPanel>>,
) {
    let RaceStatus::Failed(message) = &*status else {
        return;
    };
    if !existing.is_empty() {
        return;
    }
    // A failed setup leaves no race camera, so the panel brings its own.
    commands.spawn((
        RaceEntity,
        RaceErrorPanel,
        Camera2d,
        Camera {
            order: 1,
            ..default()
        },
    ));
    commands
        .spawn((
            RaceEntity,
            RaceErrorPanel,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                align_items: AlignItems::Center,
                justify_content: JustifyContent::Center,
                row_gap: px(8.0),
                ..default()
            },
            BackgroundColor(Color::srgba(0.3, 0.0, 0.0, 0.8)),
        ))
        .with_children(|panel| {
            panel.spawn((Text::new("Car Error"), text_font(28.0), TextColor(TEXT_COLOR)));
            panel.spawn((Text::new(message.clone()), text_font(16.0), TextColor(TEXT_COLOR)));
            panel.spawn((
                Text::new("PRESS ESC TO RETURN TO THE GARAGE"),
                text_font(12.0),
                TextColor(LABEL_COLOR),
            ));
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use garage::{Catalog, GameState};

    fn store() -> GarageStore {
        GarageStore::new(GameState::default(), Catalog::builtin())
    }

    #[test]
    fn buying_uses_catalog_paint() {
        let mut store = store();
        let message = apply_action(&mut store, &GarageAction::BuyCar("starter_hatch".into())).unwrap();
        assert!(message.starts_with("Bought"));
        let car = store.active_car().unwrap();
        let def = store.catalog().car("starter_hatch").unwrap();
        assert_eq!(car.custom_color, def.color);
    }

    #[test]
    fn failed_purchase_reports_store_error() {
        let mut store = store();
        store.buy_car("starter_hatch", "#FFFFFF").unwrap();
        let id = store.active_car().unwrap().instance_id.clone();
        let action = GarageAction::BuyUpgrade {
            car: id.clone(),
            upgrade: "turbo_1".into(),
        };
        apply_action(&mut store, &action).unwrap();
        assert!(matches!(
            apply_action(&mut store, &action),
            Err(StoreError::AlreadyInstalled(_))
        ));
    }

    #[test]
    fn dealer_card_shows_body_style() {
        let catalog = Catalog::builtin();
        let line = dealer_line(catalog.car("muscle_classic").unwrap());
        assert!(line.starts_with("[MUSCLE] V8 Stallion"), "{line}");
        assert!(line.contains("RWD"));
    }

    #[test]
    fn selling_reports_value() {
        let mut store = store();
        let id = store.buy_car("starter_hatch", "#FFFFFF").unwrap();
        let message = apply_action(&mut store, &GarageAction::SellCar(id)).unwrap();
        assert!(message.starts_with("Sold for"));
        assert!(store.active_car().is_none());
    }
}
