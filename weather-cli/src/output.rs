//! Human-readable rendering of handler results.

use chrono::Local;
use weather_core::{FavoriteLocation, Flash, Level, ProfileView, WeatherView};

pub fn flash(flash: &Flash) {
    match flash.level {
        Level::Success => println!("✓ {flash}"),
        Level::Info => println!("• {flash}"),
        Level::Error => eprintln!("✗ {flash}"),
    }
}

pub fn weather(view: &WeatherView) {
    let r = &view.record;
    println!("{}", r.location_name);
    println!("  {}°C, {} ({})", r.temperature, r.condition, r.description);
    println!("  Humidity: {}%", r.humidity);
    println!("  Wind:     {:.1} m/s", r.wind_speed);
    println!("  Coords:   {}, {}", r.latitude, r.longitude);

    if !view.favorites.is_empty() {
        println!();
        favorites(&view.favorites);
    }
}

pub fn favorites(favorites: &[FavoriteLocation]) {
    if favorites.is_empty() {
        println!("No saved locations yet.");
        return;
    }

    println!("Saved locations:");
    for fav in favorites {
        println!(
            "  [{}] {}  added {}",
            fav.id,
            fav,
            fav.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
    }
}

pub fn profile(view: &ProfileView) {
    println!("User:             {}", view.user.username);
    println!(
        "Email:            {}",
        view.user.email.as_deref().unwrap_or("-")
    );
    println!(
        "Default location: {}",
        view.profile.default_location.as_deref().unwrap_or("-")
    );
    println!(
        "Member since:     {}",
        view.user.created_at.with_timezone(&Local).format("%Y-%m-%d")
    );
    println!();
    favorites(&view.favorites);
}
