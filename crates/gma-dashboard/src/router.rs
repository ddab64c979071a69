//! Screen router: one active screen plus the parameters the results screen needs.

use std::fmt;
use std::str::FromStr;

use gma_api_models::TestType;
use thiserror::Error;

/// Every screen the dashboard can show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Screen {
    /// Landing screen with totals and shortcuts.
    #[default]
    Dashboard,
    /// Choice between the instant and full blind tests.
    BlindTestSelection,
    /// Full test over previously uploaded videos.
    FullBlindTest,
    /// Instant test over freshly uploaded videos.
    InstantBlindTest,
    /// Upload queue.
    VideoUpload,
    /// Results of one test.
    ClassificationResults,
    /// Past tests.
    History,
    /// Uploaded video management.
    Manage,
    /// Doctor profile.
    Profile,
    /// Preferences.
    Settings,
    /// Aggregate charts.
    Analytics,
    /// Help and documentation.
    Help,
}

impl Screen {
    /// Every screen, in menu order.
    pub const ALL: [Self; 12] = [
        Self::Dashboard,
        Self::BlindTestSelection,
        Self::FullBlindTest,
        Self::InstantBlindTest,
        Self::VideoUpload,
        Self::ClassificationResults,
        Self::History,
        Self::Manage,
        Self::Profile,
        Self::Settings,
        Self::Analytics,
        Self::Help,
    ];

    /// Stable identifier (`blind-test-selection`, `video-upload`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::BlindTestSelection => "blind-test-selection",
            Self::FullBlindTest => "full-blind-test",
            Self::InstantBlindTest => "instant-blind-test",
            Self::VideoUpload => "video-upload",
            Self::ClassificationResults => "classification-results",
            Self::History => "history",
            Self::Manage => "manage",
            Self::Profile => "profile",
            Self::Settings => "settings",
            Self::Analytics => "analytics",
            Self::Help => "help",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical navigation target; aliases resolve to concrete screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavTarget {
    /// A concrete screen.
    Screen(Screen),
    /// Generic "blind test" entry point; resolves to the selection screen.
    BlindTest,
    /// Generic "upload" entry point; resolves to the upload screen.
    Upload,
}

impl NavTarget {
    /// Concrete screen for this target.
    #[must_use]
    pub const fn resolve(self) -> Screen {
        match self {
            Self::Screen(screen) => screen,
            Self::BlindTest => Screen::BlindTestSelection,
            Self::Upload => Screen::VideoUpload,
        }
    }
}

impl From<Screen> for NavTarget {
    fn from(screen: Screen) -> Self {
        Self::Screen(screen)
    }
}

/// Unknown navigation target label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown navigation target")]
pub struct UnknownTarget {
    /// Label that failed to parse.
    pub label: String,
}

impl FromStr for NavTarget {
    type Err = UnknownTarget;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let label = value.trim().to_ascii_lowercase();
        match label.as_str() {
            "blind-test" => Ok(Self::BlindTest),
            "upload" => Ok(Self::Upload),
            other => Screen::ALL
                .into_iter()
                .find(|screen| screen.as_str() == other)
                .map(Self::Screen)
                .ok_or(UnknownTarget {
                    label: value.to_string(),
                }),
        }
    }
}

/// Side-channel parameters carried into the results screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavParams {
    /// Test whose results to show.
    pub test_id: Option<i64>,
    /// Display date of the selected test.
    pub test_date: Option<String>,
    /// Number of videos in the selected test.
    pub video_count: usize,
}

/// Tracks the active screen and its navigation parameters.
#[derive(Debug, Clone, Default)]
pub struct ScreenRouter {
    current: Screen,
    params: NavParams,
}

impl ScreenRouter {
    /// Router on the dashboard screen with empty parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Navigate to a target, resolving aliases. Returns the new screen.
    pub fn navigate(&mut self, target: impl Into<NavTarget>) -> Screen {
        self.current = target.into().resolve();
        self.current
    }

    /// Open the screen for the chosen blind test type.
    pub fn select_blind_test(&mut self, test_type: TestType) -> Screen {
        self.navigate(match test_type {
            TestType::Full => Screen::FullBlindTest,
            TestType::Instant => Screen::InstantBlindTest,
        })
    }

    /// Record a finished test and show its results.
    ///
    /// Absent arguments leave the previous parameter values in place.
    pub fn complete_test(&mut self, video_count: Option<usize>, test_id: Option<i64>) -> Screen {
        if let Some(count) = video_count {
            self.params.video_count = count;
        }
        if test_id.is_some() {
            self.params.test_id = test_id;
        }
        self.navigate(Screen::ClassificationResults)
    }

    /// Open the results of a test picked from history.
    pub fn view_test_details(
        &mut self,
        date: impl Into<String>,
        video_count: usize,
        test_id: Option<i64>,
    ) -> Screen {
        self.params = NavParams {
            test_id,
            test_date: Some(date.into()),
            video_count,
        };
        self.navigate(Screen::ClassificationResults)
    }

    /// Leave the current screen: results return to history, everything else to the dashboard.
    pub fn back(&mut self) -> Screen {
        let target = match self.current {
            Screen::ClassificationResults => Screen::History,
            _ => Screen::Dashboard,
        };
        self.navigate(target)
    }

    /// Return to the dashboard and forget every navigation parameter.
    pub fn reset(&mut self) {
        self.current = Screen::Dashboard;
        self.params = NavParams::default();
    }

    /// Active screen.
    #[must_use]
    pub const fn current(&self) -> Screen {
        self.current
    }

    /// Current navigation parameters.
    #[must_use]
    pub const fn params(&self) -> &NavParams {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_selection_and_upload_screens() {
        let mut router = ScreenRouter::new();
        assert_eq!(router.navigate(NavTarget::BlindTest), Screen::BlindTestSelection);
        assert_eq!(router.navigate(NavTarget::Upload), Screen::VideoUpload);
        assert_eq!(router.navigate(Screen::Manage), Screen::Manage);
    }

    #[test]
    fn labels_parse_into_targets() {
        assert_eq!("blind-test".parse::<NavTarget>(), Ok(NavTarget::BlindTest));
        assert_eq!(
            "History".parse::<NavTarget>(),
            Ok(NavTarget::Screen(Screen::History))
        );
        for screen in Screen::ALL {
            assert_eq!(
                screen.as_str().parse::<NavTarget>().map(NavTarget::resolve),
                Ok(screen)
            );
        }
        assert!("results".parse::<NavTarget>().is_err());
    }

    #[test]
    fn blind_test_choice_opens_matching_screen() {
        let mut router = ScreenRouter::new();
        assert_eq!(
            router.select_blind_test(TestType::Instant),
            Screen::InstantBlindTest
        );
        assert_eq!(router.select_blind_test(TestType::Full), Screen::FullBlindTest);
    }

    #[test]
    fn complete_test_records_params_and_shows_results() {
        let mut router = ScreenRouter::new();
        router.select_blind_test(TestType::Full);
        assert_eq!(
            router.complete_test(Some(3), Some(17)),
            Screen::ClassificationResults
        );
        assert_eq!(router.params().test_id, Some(17));
        assert_eq!(router.params().video_count, 3);

        router.complete_test(None, None);
        assert_eq!(router.params().test_id, Some(17));
    }

    #[test]
    fn back_from_results_returns_to_history() {
        let mut router = ScreenRouter::new();
        router.view_test_details("2025-05-05", 4, Some(9));
        assert_eq!(router.params().test_date.as_deref(), Some("2025-05-05"));
        assert_eq!(router.back(), Screen::History);
        assert_eq!(router.back(), Screen::Dashboard);
    }

    #[test]
    fn reset_returns_to_dashboard_from_any_screen() {
        for screen in Screen::ALL {
            let mut router = ScreenRouter::new();
            router.view_test_details("2025-01-01", 1, Some(1));
            router.navigate(screen);
            router.reset();
            assert_eq!(router.current(), Screen::Dashboard);
            assert_eq!(router.params(), &NavParams::default());
        }
    }
}
