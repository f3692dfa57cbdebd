use url::Url;

use crate::model::ProjectId;

/// Screens the client can show. Mirrors the backend-facing URL scheme so a
/// route can be typed, bookmarked, or logged as a path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Route {
    Settings,
    #[default]
    Projects,
    ProjectsPage { cursor: String },
    NewProject,
    EditProject { id: ProjectId },
    ProjectLog { id: ProjectId, cursor: Option<String> },
}

impl Route {
    /// Parses `path[?query]`. Anything unrecognised lands on the project list.
    pub fn parse(input: &str) -> Route {
        let Ok(url) = Url::parse("http://client.invalid/").and_then(|base| base.join(input.trim()))
        else {
            return Route::Projects;
        };
        let query = |name: &str| {
            url.query_pairs()
                .find(|(k, v)| k == name && !v.is_empty())
                .map(|(_, v)| v.into_owned())
        };
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            ["settings"] => Route::Settings,
            ["projects"] => match query("pc") {
                Some(cursor) => Route::ProjectsPage { cursor },
                None => Route::Projects,
            },
            ["projects", "new"] => Route::NewProject,
            ["projects", id, "edit"] => match id.parse() {
                Ok(id) => Route::EditProject { id },
                Err(_) => Route::Projects,
            },
            ["projects", id, "log"] => match id.parse() {
                Ok(id) => Route::ProjectLog {
                    id,
                    cursor: query("lc"),
                },
                Err(_) => Route::Projects,
            },
            _ => Route::Projects,
        }
    }

    pub fn projects(cursor: Option<&str>) -> Route {
        match cursor {
            Some(c) if !c.is_empty() => Route::ProjectsPage {
                cursor: c.to_string(),
            },
            _ => Route::Projects,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Settings => "/settings".to_string(),
            Route::Projects => "/projects/".to_string(),
            Route::ProjectsPage { cursor } => format!("/projects/?pc={}", encode(cursor)),
            Route::NewProject => "/projects/new".to_string(),
            Route::EditProject { id } => format!("/projects/{id}/edit"),
            Route::ProjectLog { id, cursor: None } => format!("/projects/{id}/log"),
            Route::ProjectLog {
                id,
                cursor: Some(c),
            } => format!("/projects/{id}/log?lc={}", encode(c)),
        }
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_routes() {
        assert_eq!(Route::parse("/settings"), Route::Settings);
        assert_eq!(Route::parse("/projects/"), Route::Projects);
        assert_eq!(
            Route::parse("/projects/?pc=abc"),
            Route::ProjectsPage {
                cursor: "abc".into()
            }
        );
        assert_eq!(Route::parse("/projects/new"), Route::NewProject);
        assert_eq!(Route::parse("/projects/12/edit"), Route::EditProject { id: 12 });
        assert_eq!(
            Route::parse("/projects/12/log?lc=x1"),
            Route::ProjectLog {
                id: 12,
                cursor: Some("x1".into())
            }
        );
    }

    #[test]
    fn unknown_routes_redirect_to_project_list() {
        assert_eq!(Route::parse("/nowhere"), Route::Projects);
        assert_eq!(Route::parse("/projects/abc/edit"), Route::Projects);
        assert_eq!(Route::parse(""), Route::Projects);
    }

    #[test]
    fn path_round_trips_through_parse() {
        let route = Route::ProjectLog {
            id: 3,
            cursor: Some("a b/c".into()),
        };
        assert_eq!(Route::parse(&route.path()), route);
    }
}
