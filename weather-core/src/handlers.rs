//! Request handling on top of the provider and the store.
//!
//! Every operation ends either with data to render or with a one-line
//! [`Flash`] message for the user, the same way a web view would redirect
//! with a status message.

use parking_lot::Mutex;
use std::{fmt, sync::Arc};

use crate::{
    error::StoreError,
    model::{FavoriteLocation, User, UserProfile, WeatherRecord},
    provider::WeatherProvider,
    store::WeatherStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Error,
}

/// A user-facing status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub level: Level,
    pub text: String,
}

impl Flash {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }
}

impl fmt::Display for Flash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<StoreError> for Flash {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(_) | StoreError::Io(_) => {
                tracing::error!(error = %err, "Storage failure");
                Flash::error("Something went wrong. Please try again.")
            }
            other => Flash::error(format!("{other}.")),
        }
    }
}

/// Weather for a lookup plus the viewer's saved locations.
#[derive(Debug, Clone)]
pub struct WeatherView {
    pub record: WeatherRecord,
    pub favorites: Vec<FavoriteLocation>,
}

#[derive(Debug, Clone)]
pub struct ProfileView {
    pub user: User,
    pub profile: UserProfile,
    pub favorites: Vec<FavoriteLocation>,
}

type Outcome<T> = Result<T, Flash>;

/// The application's handlers. Cheap to clone and safe to share between
/// concurrent requests; the store lock is never held across a provider call.
#[derive(Clone)]
pub struct WeatherApp {
    provider: Arc<dyn WeatherProvider>,
    store: Arc<Mutex<WeatherStore>>,
}

impl WeatherApp {
    pub fn new(provider: Arc<dyn WeatherProvider>, store: WeatherStore) -> Self {
        Self {
            provider,
            store: Arc::new(Mutex::new(store)),
        }
    }

    fn favorites_for(&self, user: Option<&User>) -> Outcome<Vec<FavoriteLocation>> {
        match user {
            Some(user) => Ok(self.store.lock().list_favorites(user.id)?),
            None => Ok(Vec::new()),
        }
    }

    /// Resolve the signed-in user by name.
    pub fn sign_in(&self, username: &str) -> Outcome<User> {
        Ok(self.store.lock().user(username)?)
    }

    /// Saved locations for the landing page; empty for anonymous visitors.
    pub fn home(&self, user: Option<&User>) -> Outcome<Vec<FavoriteLocation>> {
        self.favorites_for(user)
    }

    pub async fn search(&self, user: Option<&User>, location: &str) -> Outcome<WeatherView> {
        if location.trim().is_empty() {
            return Err(Flash::error("Please enter a location."));
        }

        let record = self
            .provider
            .lookup(Some(location), None, None)
            .await
            .map_err(|e| Flash::error(e.message))?;

        Ok(WeatherView {
            record,
            favorites: self.favorites_for(user)?,
        })
    }

    /// Weather at raw coordinates, as sent by a map click.
    pub async fn weather_at(
        &self,
        user: Option<&User>,
        latitude: Option<&str>,
        longitude: Option<&str>,
    ) -> Outcome<WeatherView> {
        let (Some(latitude), Some(longitude)) = (
            latitude.and_then(parse_coordinate),
            longitude.and_then(parse_coordinate),
        ) else {
            return Err(Flash::error("Invalid coordinates."));
        };

        let record = self
            .provider
            .lookup(None, Some(latitude), Some(longitude))
            .await
            .map_err(|e| Flash::error(e.message))?;

        Ok(WeatherView {
            record,
            favorites: self.favorites_for(user)?,
        })
    }

    /// Weather for the profile's default location.
    pub async fn default_weather(&self, user: &User) -> Outcome<WeatherView> {
        let profile = self.store.lock().profile(user.id)?;
        let Some(location) = profile.default_location else {
            return Err(Flash::info("No default location set."));
        };
        self.search(Some(user), &location).await
    }

    pub fn register(&self, username: &str, email: Option<&str>) -> Outcome<(User, Flash)> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Flash::error("Please choose a username."));
        }
        let email = email.map(str::trim).filter(|e| !e.is_empty());

        let user = self.store.lock().create_user(username, email)?;
        let flash = Flash::success(format!(
            "Account created for {username}! You are now logged in."
        ));
        Ok((user, flash))
    }

    pub fn profile(&self, user: &User) -> Outcome<ProfileView> {
        let store = self.store.lock();
        Ok(ProfileView {
            user: store.user(&user.username)?,
            profile: store.profile(user.id)?,
            favorites: store.list_favorites(user.id)?,
        })
    }

    /// Replace the email and default location. Blank values clear them.
    pub fn update_profile(
        &self,
        user: &User,
        email: Option<&str>,
        default_location: Option<&str>,
    ) -> Flash {
        let email = email.map(str::trim).filter(|e| !e.is_empty());
        let default_location = default_location.map(str::trim).filter(|l| !l.is_empty());

        let result = self
            .store
            .lock()
            .update_profile(user.id, email, default_location);

        match result {
            Ok(()) => Flash::success("Profile updated successfully!"),
            Err(e) => e.into(),
        }
    }

    pub fn save_location(
        &self,
        user: &User,
        name: Option<&str>,
        latitude: Option<&str>,
        longitude: Option<&str>,
    ) -> Flash {
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        let latitude = latitude
            .and_then(parse_coordinate)
            .filter(|v| (-90.0..=90.0).contains(v));
        let longitude = longitude
            .and_then(parse_coordinate)
            .filter(|v| (-180.0..=180.0).contains(v));

        let (Some(name), Some(latitude), Some(longitude)) = (name, latitude, longitude) else {
            return Flash::error("Invalid location data.");
        };

        match self
            .store
            .lock()
            .add_favorite(user.id, name, latitude, longitude)
        {
            Ok(_) => Flash::success(format!("\"{name}\" added to your favorites!")),
            Err(StoreError::AlreadyExists { .. }) => {
                Flash::info(format!("\"{name}\" is already in your favorites."))
            }
            Err(e) => e.into(),
        }
    }

    pub fn delete_location(&self, user: &User, id: i64) -> Flash {
        match self.store.lock().delete_favorite(user.id, id) {
            Ok(removed) => {
                Flash::success(format!("\"{}\" removed from your favorites.", removed.name))
            }
            Err(e) => e.into(),
        }
    }

    pub fn set_default_location(&self, user: &User, id: i64) -> Flash {
        let store = self.store.lock();
        let favorite = match store.favorite(user.id, id) {
            Ok(Some(favorite)) => favorite,
            Ok(None) => return StoreError::NotFound.into(),
            Err(e) => return e.into(),
        };

        match store.set_default_location(user.id, Some(favorite.name.as_str())) {
            Ok(()) => Flash::success(format!(
                "\"{}\" set as your default location.",
                favorite.name
            )),
            Err(e) => e.into(),
        }
    }
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ProviderError, ProviderErrorKind, WeatherQuery};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every query with a fixed record, or a fixed error.
    #[derive(Debug)]
    struct StubProvider {
        result: Result<WeatherRecord, ProviderError>,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn ok() -> Self {
            Self {
                result: Ok(WeatherRecord {
                    location_name: "Paris, FR".into(),
                    temperature: 18,
                    condition: "Clouds".into(),
                    description: "overcast".into(),
                    humidity: 60,
                    wind_speed: 3.2,
                    icon: "04d".into(),
                    latitude: 48.8566,
                    longitude: 2.3522,
                }),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(err: ProviderError) -> Self {
            Self {
                result: Err(err),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl WeatherProvider for StubProvider {
        fn is_configured(&self) -> bool {
            true
        }

        async fn current_weather(
            &self,
            _query: &WeatherQuery,
        ) -> Result<WeatherRecord, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn app_with(provider: StubProvider) -> (WeatherApp, Arc<StubProvider>) {
        let provider = Arc::new(provider);
        let store = WeatherStore::in_memory().unwrap();
        (WeatherApp::new(provider.clone(), store), provider)
    }

    fn alice(app: &WeatherApp) -> User {
        app.register("alice", Some("alice@example.com")).unwrap().0
    }

    #[tokio::test]
    async fn search_returns_record_and_favorites() {
        let (app, _) = app_with(StubProvider::ok());
        let user = alice(&app);
        app.save_location(&user, Some("Paris"), Some("48.8566"), Some("2.3522"));

        let view = app.search(Some(&user), "Paris").await.unwrap();
        assert_eq!(view.record.location_name, "Paris, FR");
        assert_eq!(view.favorites.len(), 1);
    }

    #[tokio::test]
    async fn anonymous_search_has_no_favorites() {
        let (app, _) = app_with(StubProvider::ok());
        let view = app.search(None, "Paris").await.unwrap();
        assert!(view.favorites.is_empty());
    }

    #[tokio::test]
    async fn empty_search_is_rejected_without_lookup() {
        let (app, provider) = app_with(StubProvider::ok());

        let flash = app.search(None, "  ").await.unwrap_err();
        assert_eq!(flash, Flash::error("Please enter a location."));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn provider_errors_become_flash_messages() {
        let (app, _) = app_with(StubProvider::failing(ProviderError::not_found()));

        let flash = app.search(None, "Atlantis").await.unwrap_err();
        assert!(flash.is_error());
        assert_eq!(flash.text, ProviderError::not_found().message);
    }

    #[tokio::test]
    async fn weather_at_parses_coordinates() {
        let (app, provider) = app_with(StubProvider::ok());

        let view = app
            .weather_at(None, Some("48.8566"), Some("2.3522"))
            .await
            .unwrap();
        assert_eq!(view.record.temperature, 18);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn weather_at_rejects_bad_coordinates() {
        let (app, provider) = app_with(StubProvider::ok());

        for (lat, lon) in [
            (None, Some("2.0")),
            (Some("north"), Some("2.0")),
            (Some(""), Some("")),
            (Some("NaN"), Some("2.0")),
        ] {
            let flash = app.weather_at(None, lat, lon).await.unwrap_err();
            assert_eq!(flash, Flash::error("Invalid coordinates."));
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn default_weather_uses_profile() {
        let (app, _) = app_with(StubProvider::ok());
        let user = alice(&app);

        let flash = app.default_weather(&user).await.unwrap_err();
        assert_eq!(flash.level, Level::Info);

        app.update_profile(&user, None, Some("Paris"));
        let view = app.default_weather(&user).await.unwrap();
        assert_eq!(view.record.location_name, "Paris, FR");
    }

    #[test]
    fn register_rejects_duplicates() {
        let (app, _) = app_with(StubProvider::ok());
        let (_, flash) = app.register("alice", None).unwrap();
        assert_eq!(flash.level, Level::Success);

        let flash = app.register("alice", None).unwrap_err();
        assert!(flash.is_error());
        assert!(flash.text.contains("already taken"));
    }

    #[test]
    fn save_location_flow() {
        let (app, _) = app_with(StubProvider::ok());
        let user = alice(&app);

        let flash = app.save_location(&user, Some("Paris"), Some("48.8566"), Some("2.3522"));
        assert_eq!(flash, Flash::success("\"Paris\" added to your favorites!"));

        let flash = app.save_location(&user, Some("Paris"), Some("48.8566"), Some("2.3522"));
        assert_eq!(flash, Flash::info("\"Paris\" is already in your favorites."));

        assert_eq!(app.home(Some(&user)).unwrap().len(), 1);
    }

    #[test]
    fn save_location_validates_input() {
        let (app, _) = app_with(StubProvider::ok());
        let user = alice(&app);

        for (name, lat, lon) in [
            (None, Some("1"), Some("2")),
            (Some(""), Some("1"), Some("2")),
            (Some("X"), Some("abc"), Some("2")),
            (Some("X"), Some("91"), Some("2")),
            (Some("X"), Some("1"), Some("-181")),
            (Some("X"), Some("1"), None),
        ] {
            let flash = app.save_location(&user, name, lat, lon);
            assert_eq!(flash, Flash::error("Invalid location data."));
        }
        assert!(app.home(Some(&user)).unwrap().is_empty());
    }

    #[test]
    fn concurrent_duplicate_saves_store_one_row() {
        let (app, _) = app_with(StubProvider::ok());
        let user = alice(&app);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let app = app.clone();
                let user = user.clone();
                std::thread::spawn(move || {
                    app.save_location(&user, Some("Paris"), Some("48.8566"), Some("2.3522"))
                })
            })
            .collect();

        let flashes: Vec<Flash> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let added = flashes.iter().filter(|f| f.level == Level::Success).count();
        let existing = flashes.iter().filter(|f| f.level == Level::Info).count();

        assert_eq!(added, 1);
        assert_eq!(existing, 7);
        assert_eq!(app.home(Some(&user)).unwrap().len(), 1);
    }

    #[test]
    fn delete_location_only_for_owner() {
        let (app, _) = app_with(StubProvider::ok());
        let user = alice(&app);
        let (bob, _) = app.register("bob", None).unwrap();
        app.save_location(&user, Some("Paris"), Some("48.8566"), Some("2.3522"));
        let id = app.home(Some(&user)).unwrap()[0].id;

        let flash = app.delete_location(&bob, id);
        assert_eq!(flash, Flash::error("Location not found."));

        let flash = app.delete_location(&user, id);
        assert_eq!(flash, Flash::success("\"Paris\" removed from your favorites."));
        assert!(app.home(Some(&user)).unwrap().is_empty());
    }

    #[test]
    fn set_default_location_from_favorite() {
        let (app, _) = app_with(StubProvider::ok());
        let user = alice(&app);
        app.save_location(&user, Some("Paris"), Some("48.8566"), Some("2.3522"));
        let id = app.home(Some(&user)).unwrap()[0].id;

        let flash = app.set_default_location(&user, id);
        assert_eq!(flash, Flash::success("\"Paris\" set as your default location."));

        let view = app.profile(&user).unwrap();
        assert_eq!(view.profile.default_location.as_deref(), Some("Paris"));

        let flash = app.set_default_location(&user, id + 100);
        assert!(flash.is_error());
    }

    #[test]
    fn update_profile_sets_and_clears() {
        let (app, _) = app_with(StubProvider::ok());
        let user = alice(&app);

        let flash = app.update_profile(&user, Some("new@example.com"), Some("Oslo"));
        assert_eq!(flash, Flash::success("Profile updated successfully!"));

        let view = app.profile(&user).unwrap();
        assert_eq!(view.user.email.as_deref(), Some("new@example.com"));
        assert_eq!(view.profile.default_location.as_deref(), Some("Oslo"));

        app.update_profile(&user, Some(""), Some(" "));
        let view = app.profile(&user).unwrap();
        assert_eq!(view.user.email, None);
        assert_eq!(view.profile.default_location, None);
    }

    #[tokio::test]
    async fn unconfigured_provider_message_reaches_user() {
        let (app, _) = app_with(StubProvider::failing(ProviderError::unconfigured()));
        let flash = app.search(None, "Paris").await.unwrap_err();
        assert_eq!(flash.text, "Weather API key is not configured.");
        assert_eq!(
            ProviderError::unconfigured().kind,
            ProviderErrorKind::Unconfigured
        );
    }

    #[test]
    fn sign_in_unknown_user() {
        let (app, _) = app_with(StubProvider::ok());
        let flash = app.sign_in("ghost").unwrap_err();
        assert!(flash.is_error());
    }
}
