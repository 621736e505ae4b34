//! Route table with per-route allowed roles, and the guard in front of it.

use crate::auth::{Role, Session};
use crate::resource::RecordId;
use std::fmt;
use tracing::debug;

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    StudentDashboard,
    StudentApplication,
    StudentEnrollments,
    StudentGrades,
    TeacherDashboard,
    TeacherModules,
    TeacherGrades(RecordId),
    AdminDashboard,
    AdminDepartments,
    AdminPrograms,
    AdminModules,
    AdminEnrollments,
    AdminUsers,
    DirectionStats,
    DirectionReports,
    DirectionPerformance,
}

const STUDENT: &[Role] = &[Role::Etudiant];
const TEACHER: &[Role] = &[Role::Enseignant];
const ADMIN: &[Role] = &[Role::Admin];
const DIRECTION: &[Role] = &[Role::Direction, Role::Admin];

impl Route {
    pub fn allowed_roles(&self) -> &'static [Role] {
        use Route::*;
        match self {
            StudentDashboard | StudentApplication | StudentEnrollments | StudentGrades => STUDENT,
            TeacherDashboard | TeacherModules | TeacherGrades(_) => TEACHER,
            AdminDashboard | AdminDepartments | AdminPrograms | AdminModules | AdminEnrollments | AdminUsers => ADMIN,
            DirectionStats | DirectionReports | DirectionPerformance => DIRECTION,
        }
    }

    pub fn path(&self) -> String {
        use Route::*;
        match self {
            StudentDashboard => "/etudiant/dashboard".into(),
            StudentApplication => "/etudiant/candidature".into(),
            StudentEnrollments => "/etudiant/inscriptions".into(),
            StudentGrades => "/etudiant/notes".into(),
            TeacherDashboard => "/enseignant/dashboard".into(),
            TeacherModules => "/enseignant/modules".into(),
            TeacherGrades(module_id) => format!("/enseignant/notes/{}", module_id),
            AdminDashboard => "/admin/dashboard".into(),
            AdminDepartments => "/admin/departements".into(),
            AdminPrograms => "/admin/filieres".into(),
            AdminModules => "/admin/modules".into(),
            AdminEnrollments => "/admin/inscriptions".into(),
            AdminUsers => "/admin/users".into(),
            DirectionStats => "/direction/stats".into(),
            DirectionReports => "/direction/rapports".into(),
            DirectionPerformance => "/direction/performance".into(),
        }
    }

    /// Unknown paths yield `None`; the caller sends those to login.
    pub fn parse(path: &str) -> Option<Route> {
        use Route::*;
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let route = match segments.as_slice() {
            ["etudiant", "dashboard"] => StudentDashboard,
            ["etudiant", "candidature"] => StudentApplication,
            ["etudiant", "inscriptions"] => StudentEnrollments,
            ["etudiant", "notes"] => StudentGrades,
            ["enseignant", "dashboard"] => TeacherDashboard,
            ["enseignant", "modules"] => TeacherModules,
            ["enseignant", "notes", id] => TeacherGrades(id.parse().ok()?),
            ["admin", "dashboard"] => AdminDashboard,
            ["admin", "departements"] => AdminDepartments,
            ["admin", "filieres"] => AdminPrograms,
            ["admin", "modules"] => AdminModules,
            ["admin", "inscriptions"] => AdminEnrollments,
            ["admin", "users"] => AdminUsers,
            ["direction", "stats"] => DirectionStats,
            ["direction", "rapports"] => DirectionReports,
            ["direction", "performance"] => DirectionPerformance,
            _ => return None,
        };
        Some(route)
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    RedirectToLogin,
    Forbidden { role: Role },
}

/// Capability check of the session's role against the route's allowed roles.
pub fn guard(route: Route, session: Option<&Session>) -> Access {
    let access = match session {
        None => Access::RedirectToLogin,
        Some(s) if route.allows(s.role) => Access::Allowed,
        Some(s) => Access::Forbidden { role: s.role },
    };
    debug!("Guard {} -> {:?}", route, access);
    access
}

/// Where a role lands after login.
pub fn landing_route(role: Role) -> Route {
    match role {
        Role::Etudiant => Route::StudentDashboard,
        Role::Enseignant => Route::TeacherDashboard,
        Role::Admin => Route::AdminDashboard,
        Role::Direction => Route::DirectionStats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;

    fn session(role: Role) -> Session {
        Session::from(Credentials {
            access: "a".into(),
            refresh: "r".into(),
            role,
            username: "u".into(),
        })
    }

    #[test]
    fn missing_session_redirects_to_login() {
        assert_eq!(guard(Route::AdminUsers, None), Access::RedirectToLogin);
    }

    #[test]
    fn roles_only_reach_their_own_pages() {
        let student = session(Role::Etudiant);
        assert_eq!(guard(Route::StudentGrades, Some(&student)), Access::Allowed);
        assert_eq!(
            guard(Route::AdminModules, Some(&student)),
            Access::Forbidden { role: Role::Etudiant }
        );
        let teacher = session(Role::Enseignant);
        assert_eq!(guard(Route::TeacherGrades(3), Some(&teacher)), Access::Allowed);
        assert_ne!(guard(Route::StudentDashboard, Some(&teacher)), Access::Allowed);
    }

    #[test]
    fn direction_pages_admit_admins() {
        let admin = session(Role::Admin);
        let direction = session(Role::Direction);
        assert_eq!(guard(Route::DirectionPerformance, Some(&admin)), Access::Allowed);
        assert_eq!(guard(Route::DirectionStats, Some(&direction)), Access::Allowed);
        assert_ne!(guard(Route::AdminDashboard, Some(&direction)), Access::Allowed);
    }

    #[test]
    fn paths_parse_back() {
        for route in [Route::TeacherGrades(12), Route::AdminPrograms, Route::DirectionReports] {
            assert_eq!(Route::parse(&route.path()), Some(route));
        }
        assert_eq!(Route::parse("/enseignant/notes/abc"), None);
        assert_eq!(Route::parse("/nowhere"), None);
    }

    #[test]
    fn every_role_lands_on_an_allowed_page() {
        for role in Role::ALL {
            assert!(landing_route(role).allows(role));
        }
    }
}
