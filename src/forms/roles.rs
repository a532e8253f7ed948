//! User roles and the dashboard and navigation each one gets.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Student,
    Teacher,
    Hod,
    Admin,
}

/// Dashboard variant rendered for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Dashboard {
    Student,
    Teacher,
    /// Head-of-department overview, shared by HODs and admins.
    Department,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct NavItem {
    pub title: &'static str,
    pub url: &'static str,
}

const fn nav(title: &'static str, url: &'static str) -> NavItem {
    NavItem { title, url }
}

const STUDENT_NAV: &[NavItem] = &[
    nav("Dashboard", "/dashboard"),
    nav("My Courses", "/courses"),
    nav("Attendance", "/attendance"),
    nav("Quizzes", "/quizzes"),
    nav("Timetable", "/timetable"),
    nav("AI Tutor", "/ai-tutor"),
    nav("Team Finder", "/team-finder"),
    nav("Certifications", "/certifications"),
    nav("Notifications", "/notifications"),
];

const TEACHER_NAV: &[NavItem] = &[
    nav("Dashboard", "/dashboard"),
    nav("My Classes", "/classes"),
    nav("Live Classroom", "/live-classroom"),
    nav("Attendance Monitor", "/attendance-monitor"),
    nav("Quiz Management", "/quiz-management"),
    nav("Course Content", "/course-content"),
    nav("Timetable", "/timetable"),
    nav("Analytics", "/analytics"),
    nav("Notifications", "/notifications"),
];

const DEPARTMENT_NAV: &[NavItem] = &[
    nav("Dashboard", "/dashboard"),
    nav("Department Overview", "/department"),
    nav("Faculty Management", "/faculty"),
    nav("Course Management", "/course-management"),
    nav("Timetable Generation", "/timetable-generation"),
    nav("Attendance Reports", "/attendance-reports"),
    nav("Academic Analytics", "/academic-analytics"),
    nav("Resource Allocation", "/resources"),
    nav("Notifications", "/notifications"),
];

impl Role {
    /// Roles a user may pick when signing up. Admins are provisioned out of band.
    pub const SELECTABLE: [Role; 3] = [Role::Student, Role::Teacher, Role::Hod];

    /// Parse a stored role string. Anything unrecognised is treated as a student.
    pub fn parse_or_student(s: Option<&str>) -> Self {
        s.and_then(|s| s.parse().ok()).unwrap_or(Role::Student)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Hod => "hod",
            Role::Admin => "admin",
        }
    }

    pub fn dashboard(self) -> Dashboard {
        match self {
            Role::Student => Dashboard::Student,
            Role::Teacher => Dashboard::Teacher,
            Role::Hod | Role::Admin => Dashboard::Department,
        }
    }

    pub fn navigation(self) -> &'static [NavItem] {
        match self.dashboard() {
            Dashboard::Student => STUDENT_NAV,
            Dashboard::Teacher => TEACHER_NAV,
            Dashboard::Department => DEPARTMENT_NAV,
        }
    }

    pub fn section_label(self) -> &'static str {
        match self.dashboard() {
            Dashboard::Student => "Learning Hub",
            Dashboard::Teacher => "Teaching Tools",
            Dashboard::Department => "Management",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "hod" => Ok(Role::Hod),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_route_to_their_dashboard() {
        assert_eq!(Role::Student.dashboard(), Dashboard::Student);
        assert_eq!(Role::Teacher.dashboard(), Dashboard::Teacher);
        assert_eq!(Role::Hod.dashboard(), Dashboard::Department);
        assert_eq!(Role::Admin.dashboard(), Dashboard::Department);
    }

    #[test]
    fn unknown_roles_fall_back_to_student() {
        assert_eq!(Role::parse_or_student(Some("principal")), Role::Student);
        assert_eq!(Role::parse_or_student(None), Role::Student);
        assert_eq!(Role::parse_or_student(Some(" HOD ")), Role::Hod);
    }

    #[test]
    fn navigation_matches_role() {
        let teacher = Role::Teacher.navigation();
        assert!(teacher.iter().any(|i| i.url == "/live-classroom"));
        assert!(!Role::Student.navigation().iter().any(|i| i.url == "/live-classroom"));
        assert_eq!(Role::Admin.navigation(), Role::Hod.navigation());
        for role in [Role::Student, Role::Teacher, Role::Hod] {
            assert_eq!(role.navigation()[0].url, "/dashboard");
            assert_eq!(role.navigation().last().map(|i| i.title), Some("Notifications"));
        }
        assert_eq!(Role::Teacher.section_label(), "Teaching Tools");
        assert_eq!(Role::Admin.section_label(), "Management");
        assert_eq!(Role::Student.section_label(), "Learning Hub");
    }
}
