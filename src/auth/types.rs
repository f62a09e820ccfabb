use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 学号的规范长度
pub const STUDENT_NUMBER_WIDTH: usize = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Parent,
    Student,
}

/// 登录标识的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    StudentNumber,
    Username,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Parent => "parent",
            Role::Student => "student",
        }
    }

    /// 学生只能用学号登录，其余角色只能用用户名登录
    pub fn accepts(&self, kind: IdentifierKind) -> bool {
        match (self, kind) {
            (Role::Student, IdentifierKind::StudentNumber) => true,
            (Role::Student, IdentifierKind::Username) => false,
            (Role::Admin | Role::Teacher | Role::Parent, IdentifierKind::Username) => true,
            (Role::Admin | Role::Teacher | Role::Parent, IdentifierKind::StudentNumber) => false,
        }
    }

    /// 登录成功后的落地页
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin/dashboard",
            Role::Teacher => "/teacher/dashboard",
            Role::Parent => "/parent/dashboard",
            Role::Student => "/student/dashboard",
        }
    }

    /// 前端页面组件名
    pub fn dashboard_component(&self) -> &'static str {
        match self {
            Role::Admin => "Admin/Dashboard",
            Role::Teacher => "Teacher/Dashboard",
            Role::Parent => "Parent/Dashboard",
            Role::Student => "Student/Dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "parent" => Ok(Role::Parent),
            "student" => Ok(Role::Student),
            _ => Err(format!("未知角色: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub username: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentProfile {
    pub id: i64,
    pub nis: String,
    pub account_id: i64,
}

/// 用户提交的登录标识，学号与用户名互斥
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    StudentNumber(String),
    Username(String),
}

impl Identifier {
    /// 从表单字段构造标识，空白字段视为未提供，学号优先
    pub fn from_fields(nis: Option<&str>, username: Option<&str>) -> Option<Self> {
        let filled = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        if let Some(nis) = filled(nis) {
            return Some(Identifier::StudentNumber(nis));
        }
        filled(username).map(Identifier::Username)
    }

    pub fn value(&self) -> &str {
        match self {
            Identifier::StudentNumber(v) | Identifier::Username(v) => v,
        }
    }
}

/// 会话 cookie 中的 JWT 载荷
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: String, // account id，访客为空
    pub sid: String, // session id
    pub exp: usize,
    pub name: Option<String>,
    pub role: Option<Role>,
}

impl Claims {
    pub fn account_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}
