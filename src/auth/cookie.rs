use axum_extra::extract::cookie::{Cookie, SameSite};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// 携带访问令牌的 cookie：HttpOnly、Secure、SameSite=Lax、Path=/
pub fn auth_cookie(token: String, max_age: chrono::Duration) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, token))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age.num_seconds()))
        .path("/")
        .build()
}

/// 让浏览器立即删除令牌 cookie
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((ACCESS_TOKEN_COOKIE, "")).path("/").build();
    cookie.make_removal();
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_cookie_attributes() {
        let cookie = auth_cookie("abc.def.ghi".to_string(), chrono::Duration::days(7));
        assert_eq!(cookie.name(), ACCESS_TOKEN_COOKIE);
        assert_eq!(cookie.value(), "abc.def.ghi");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(604800)));
    }

    #[test]
    fn removal_cookie_expires_immediately() {
        let cookie = removal_cookie();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }
}
