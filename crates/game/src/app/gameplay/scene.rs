use std::time::Duration;

use engine::world::{
    tint_color, Character, ClockQuery, DrawContext, DrawTarget, MapViewer, PixelRect, RenderState,
    Vec2,
};
use engine::{InputAction, InputSnapshot, Scene, SceneCommand};

use super::world_state::{PlayerIntent, WorldState, USE_REACH_PX};

const USE_MARKER_RGBA: [u8; 4] = [255, 0, 0, 255];

pub(crate) struct MapScene {
    world: WorldState,
    viewer: MapViewer,
}

impl MapScene {
    pub(crate) fn new(world: WorldState) -> Self {
        let mut viewer = MapViewer::new(world.active_map());
        viewer.center_on(world.player.body.position);
        Self { world, viewer }
    }

    #[cfg(test)]
    pub(crate) fn world(&self) -> &WorldState {
        &self.world
    }

    fn follow_player(&mut self) {
        let body = &self.world.player.body;
        if self.viewer.map() != body.map {
            self.viewer.set_map(body.map);
        }
        self.viewer.center_on(body.position);
    }
}

impl Scene for MapScene {
    fn update(&mut self, dt: Duration, input: &InputSnapshot) -> SceneCommand {
        if input.quit_requested() || input.pressed(InputAction::Quit) {
            return SceneCommand::Quit;
        }
        self.world.tick(dt, PlayerIntent::from_input(input));
        self.follow_player();
        SceneCommand::None
    }

    fn render(&mut self, target: &mut dyn DrawTarget) {
        let (width, height) = target.size();
        let size = Vec2::new(width as f32, height as f32);
        if self.viewer.area().size() != size {
            self.viewer.resize(size);
            self.viewer.center_on(self.world.player.body.position);
        }

        let world = &self.world;
        let characters: Vec<&Character> = std::iter::once(&world.player)
            .chain(world.npcs.iter())
            .collect();
        let ctx = DrawContext {
            maps: &world.maps,
            characters: &characters,
            season: world.clock.date().season(),
            debug_collision: world.debug_collision,
        };
        self.viewer.draw(&ctx, target);

        let screen = RenderState::screen(width, height);
        if world.debug_collision {
            let area = self.viewer.area();
            let marker = world.player.body.use_position(USE_REACH_PX);
            target.fill_rect(
                &screen,
                PixelRect::new((marker.x - area.left) as i32 - 1, (marker.y - area.top) as i32 - 1, 3, 3),
                USE_MARKER_RGBA,
            );
        }

        let tint = tint_color(world.clock.hour());
        if tint[3] > 0 {
            target.fill_rect(&screen, PixelRect::new(0, 0, width, height), tint);
        }
    }

    fn debug_title(&self) -> Option<String> {
        let map = self.world.active_map();
        Some(format!("Tileworld - {}", self.world.maps[map].name()))
    }

    fn debug_lines(&self) -> Vec<String> {
        self.world.status_lines()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::world::{
        Body, Date, Direction, GameClock, Hour, Map, MapId, MapRegistry, MoveSpeed, TilePos,
    };

    #[derive(Default)]
    struct Recorder {
        fills: Vec<(PixelRect, [u8; 4])>,
        images: Vec<String>,
    }

    impl DrawTarget for Recorder {
        fn size(&self) -> (u32, u32) {
            (640, 480)
        }

        fn draw_image(&mut self, _: &RenderState, texture: &str, _: PixelRect, _: (i32, i32)) {
            self.images.push(texture.to_string());
        }

        fn fill_rect(&mut self, _: &RenderState, rect: PixelRect, rgba: [u8; 4]) {
            self.fills.push((rect, rgba));
        }
    }

    fn scene_at(hour: Hour) -> MapScene {
        let mut maps = MapRegistry::new();
        maps.insert(Map::new("meadow", 40, 40)).expect("insert meadow");
        let player = Character::new(
            "player",
            Body::new(MapId(0), TilePos::new(10, 10).center(), Vec2::new(32.0, 32.0)),
        );
        MapScene::new(WorldState::new(maps, GameClock::at(Date::new(0), hour), player))
    }

    #[test]
    fn escape_quits_before_simulating() {
        let mut scene = scene_at(Hour::NOON);
        let input = InputSnapshot::empty()
            .with_action_down(InputAction::Quit, true)
            .with_action_down(InputAction::MoveDown, true);
        assert_eq!(scene.update(Duration::from_millis(16), &input), SceneCommand::Quit);
        assert_eq!(scene.world().player.body.position, TilePos::new(10, 10).center());
    }

    #[test]
    fn viewer_follows_the_player() {
        let mut scene = scene_at(Hour::NOON);
        let input = InputSnapshot::empty().with_action_down(InputAction::MoveRight, true);
        for _ in 0..6 {
            assert_eq!(scene.update(Duration::from_millis(50), &input), SceneCommand::None);
        }
        let player = scene.world().player.body.position;
        assert_eq!(scene.world().player.body.facing(), Direction::Right);
        assert_eq!(scene.world().player.body.speed(), MoveSpeed::Trot);
        assert!((scene.viewer.center().x - player.x).abs() <= 1.0);
    }

    #[test]
    fn night_tint_covers_the_whole_screen_after_the_world() {
        let mut scene = scene_at(Hour::MIDNIGHT);
        let mut recorder = Recorder::default();
        scene.render(&mut recorder);

        let (rect, rgba) = recorder.fills.last().copied().expect("tint drawn");
        assert_eq!(rect, PixelRect::new(0, 0, 640, 480));
        assert_eq!(rgba, [32, 16, 64, 102]);
        assert_eq!(scene.viewer.area().size(), Vec2::new(640.0, 480.0));
    }

    #[test]
    fn midday_has_no_tint() {
        let mut scene = scene_at(Hour::NOON);
        let mut recorder = Recorder::default();
        scene.render(&mut recorder);
        assert!(recorder
            .fills
            .iter()
            .all(|(rect, _)| *rect != PixelRect::new(0, 0, 640, 480)));
    }

    #[test]
    fn title_and_overlay_name_the_active_map() {
        let scene = scene_at(Hour::DAWN);
        assert_eq!(scene.debug_title().as_deref(), Some("Tileworld - meadow"));
        let lines = scene.debug_lines();
        assert_eq!(lines[0], "map meadow");
        assert_eq!(lines[1], "06:00 spring day 1 year 1");
    }
}
