use shotclock_common::creds::Credentials;

/// Views the shell can land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Settings,
    Dashboard,
}

/// Navigation guard, evaluated on every navigation: complete credentials
/// open the dashboard, anything less lands on settings. Settings itself
/// is always reachable directly.
pub fn decide(creds: Option<&Credentials>) -> Route {
    match creds {
        Some(c) if c.is_complete() => Route::Dashboard,
        _ => Route::Settings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_credentials_routes_to_settings() {
        assert_eq!(decide(None), Route::Settings);
    }

    #[test]
    fn incomplete_credentials_route_to_settings() {
        let creds = Credentials::new("erp.example.com".into(), String::new(), "s".into());
        assert_eq!(decide(Some(&creds)), Route::Settings);
    }

    #[test]
    fn complete_credentials_route_to_dashboard() {
        let creds = Credentials::new("erp.example.com".into(), "k".into(), "s".into());
        assert_eq!(decide(Some(&creds)), Route::Dashboard);
    }
}
