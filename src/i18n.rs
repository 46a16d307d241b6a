//! Interface language, navigation labels and flash message texts.
//!
//! The portal speaks Chinese, English and Vietnamese. The active language is
//! kept in the `lang` cookie; anything unrecognised falls back to Chinese.

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    Zh,
    En,
    Vi,
}

impl Lang {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "zh" => Some(Lang::Zh),
            "en" => Some(Lang::En),
            "vi" => Some(Lang::Vi),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Lang::Zh => "zh",
            Lang::En => "en",
            Lang::Vi => "vi",
        }
    }
}

// (key, zh, en, vi)
const NAV_LABELS: [(&str, &str, &str, &str); 17] = [
    ("home", "首页", "Home", "Trang chủ"),
    ("chinese_courses", "中文教学", "Chinese Courses", "Khóa học tiếng Trung"),
    ("study_abroad", "留学服务", "Study Abroad", "Du học"),
    ("camp", "研学旅行", "Summer Camp", "Trại hè"),
    ("about", "关于我们", "About Us", "Về chúng tôi"),
    ("login", "登录", "Login", "Đăng nhập"),
    ("register", "注册", "Register", "Đăng ký"),
    ("logout", "退出登录", "Logout", "Đăng xuất"),
    ("dashboard", "控制面板", "Dashboard", "Bảng điều khiển"),
    ("welcome", "欢迎", "Welcome", "Chào mừng"),
    ("courses", "课程", "Courses", "Khóa học"),
    ("materials", "学习资料", "Materials", "Tài liệu"),
    ("schedule", "课程表", "Schedule", "Lịch học"),
    ("leave_request", "请假申请", "Leave Request", "Xin nghỉ phép"),
    ("speech_practice", "AI口语练习", "AI Speech Practice", "Luyện nói AI"),
    ("profile", "个人资料", "Profile", "Hồ sơ"),
    ("settings", "设置", "Settings", "Cài đặt"),
];

pub fn nav_labels(lang: Lang) -> BTreeMap<&'static str, &'static str> {
    NAV_LABELS
        .iter()
        .map(|(key, zh, en, vi)| {
            let label = match lang {
                Lang::Zh => *zh,
                Lang::En => *en,
                Lang::Vi => *vi,
            };
            (*key, label)
        })
        .collect()
}

/// Display color for a course level badge.
pub fn course_color(level: &str) -> &'static str {
    match level {
        "HSK1" => "#28a745",
        "HSK2" => "#17a2b8",
        "HSK3" => "#ffc107",
        "HSK4" => "#fd7e14",
        "HSK5" => "#dc3545",
        "HSK6" => "#6f42c1",
        "oral" => "#20c997",
        _ => "#6c757d",
    }
}

/// Name of the class group formed by a course's students.
pub fn class_name(lang: Lang, course_name: &str) -> String {
    match lang {
        Lang::Zh => format!("{}班", course_name),
        Lang::En => format!("{} Class", course_name),
        Lang::Vi => format!("Lớp {}", course_name),
    }
}

pub fn speech_feedback(lang: Lang, pronunciation: i32, fluency: i32) -> String {
    match lang {
        Lang::Zh => format!(
            "整体表现不错。发音准确度：{}分，流利度：{}分。",
            pronunciation, fluency
        ),
        Lang::En => format!(
            "Good overall performance. Pronunciation accuracy: {}, fluency: {}.",
            pronunciation, fluency
        ),
        Lang::Vi => format!(
            "Thể hiện tổng thể tốt. Độ chính xác phát âm: {} điểm, độ trôi chảy: {} điểm.",
            pronunciation, fluency
        ),
    }
}

/// Every message that can be flashed across a redirect.
///
/// Only the code travels in the cookie; the text is resolved in the
/// language of the page that finally displays it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashMessage {
    LoginSucceeded,
    InvalidCredentials,
    LoggedOut,
    LoginRequired,
    RegistrationSucceeded,
    RegistrationFailed,
    UsernameTaken,
    EmailTaken,
    InvalidRole,
    InvalidForm,
    PermissionDenied,
    StudentProfileMissing,
    TeacherProfileMissing,
    LeaveSubmitted,
    LeaveSubmitFailed,
    NotEnrolled,
    LeaveApproved,
    LeaveRejected,
    LeaveNotFound,
    LeaveAlreadyProcessed,
    OperationFailed,
    Enrolled,
    AlreadyEnrolled,
    CourseFull,
    CourseNotFound,
    MaterialUploaded,
    LessonScheduled,
    AvatarUpdated,
    UploadFailed,
}

impl FlashMessage {
    const ALL: [FlashMessage; 29] = [
        FlashMessage::LoginSucceeded,
        FlashMessage::InvalidCredentials,
        FlashMessage::LoggedOut,
        FlashMessage::LoginRequired,
        FlashMessage::RegistrationSucceeded,
        FlashMessage::RegistrationFailed,
        FlashMessage::UsernameTaken,
        FlashMessage::EmailTaken,
        FlashMessage::InvalidRole,
        FlashMessage::InvalidForm,
        FlashMessage::PermissionDenied,
        FlashMessage::StudentProfileMissing,
        FlashMessage::TeacherProfileMissing,
        FlashMessage::LeaveSubmitted,
        FlashMessage::LeaveSubmitFailed,
        FlashMessage::NotEnrolled,
        FlashMessage::LeaveApproved,
        FlashMessage::LeaveRejected,
        FlashMessage::LeaveNotFound,
        FlashMessage::LeaveAlreadyProcessed,
        FlashMessage::OperationFailed,
        FlashMessage::Enrolled,
        FlashMessage::AlreadyEnrolled,
        FlashMessage::CourseFull,
        FlashMessage::CourseNotFound,
        FlashMessage::MaterialUploaded,
        FlashMessage::LessonScheduled,
        FlashMessage::AvatarUpdated,
        FlashMessage::UploadFailed,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            FlashMessage::LoginSucceeded => "login_succeeded",
            FlashMessage::InvalidCredentials => "invalid_credentials",
            FlashMessage::LoggedOut => "logged_out",
            FlashMessage::LoginRequired => "login_required",
            FlashMessage::RegistrationSucceeded => "registration_succeeded",
            FlashMessage::RegistrationFailed => "registration_failed",
            FlashMessage::UsernameTaken => "username_taken",
            FlashMessage::EmailTaken => "email_taken",
            FlashMessage::InvalidRole => "invalid_role",
            FlashMessage::InvalidForm => "invalid_form",
            FlashMessage::PermissionDenied => "permission_denied",
            FlashMessage::StudentProfileMissing => "student_profile_missing",
            FlashMessage::TeacherProfileMissing => "teacher_profile_missing",
            FlashMessage::LeaveSubmitted => "leave_submitted",
            FlashMessage::LeaveSubmitFailed => "leave_submit_failed",
            FlashMessage::NotEnrolled => "not_enrolled",
            FlashMessage::LeaveApproved => "leave_approved",
            FlashMessage::LeaveRejected => "leave_rejected",
            FlashMessage::LeaveNotFound => "leave_not_found",
            FlashMessage::LeaveAlreadyProcessed => "leave_already_processed",
            FlashMessage::OperationFailed => "operation_failed",
            FlashMessage::Enrolled => "enrolled",
            FlashMessage::AlreadyEnrolled => "already_enrolled",
            FlashMessage::CourseFull => "course_full",
            FlashMessage::CourseNotFound => "course_not_found",
            FlashMessage::MaterialUploaded => "material_uploaded",
            FlashMessage::LessonScheduled => "lesson_scheduled",
            FlashMessage::AvatarUpdated => "avatar_updated",
            FlashMessage::UploadFailed => "upload_failed",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|message| message.code() == code)
    }

    pub fn text(&self, lang: Lang) -> &'static str {
        let (zh, en, vi) = match self {
            FlashMessage::LoginSucceeded => ("登录成功！", "Logged in successfully!", "Đăng nhập thành công!"),
            FlashMessage::InvalidCredentials => (
                "用户名或密码错误！",
                "Incorrect username or password!",
                "Sai tên đăng nhập hoặc mật khẩu!",
            ),
            FlashMessage::LoggedOut => ("您已退出登录", "You have been logged out", "Bạn đã đăng xuất"),
            FlashMessage::LoginRequired => ("请先登录", "Please log in first", "Vui lòng đăng nhập trước"),
            FlashMessage::RegistrationSucceeded => (
                "注册成功！请登录。",
                "Registration successful! Please log in.",
                "Đăng ký thành công! Vui lòng đăng nhập.",
            ),
            FlashMessage::RegistrationFailed => ("注册失败，请重试", "Registration failed, please try again", "Đăng ký thất bại, vui lòng thử lại"),
            FlashMessage::UsernameTaken => ("用户名已存在！", "Username already exists!", "Tên đăng nhập đã tồn tại!"),
            FlashMessage::EmailTaken => ("邮箱已被注册！", "Email is already registered!", "Email đã được đăng ký!"),
            FlashMessage::InvalidRole => ("不支持的账户类型", "Unsupported account type", "Loại tài khoản không được hỗ trợ"),
            FlashMessage::InvalidForm => ("表单内容无效", "The form contains invalid values", "Biểu mẫu có giá trị không hợp lệ"),
            FlashMessage::PermissionDenied => ("权限不足！", "Permission denied!", "Không đủ quyền!"),
            FlashMessage::StudentProfileMissing => (
                "学生资料不完整，请联系管理员！",
                "Student profile is incomplete, please contact an administrator!",
                "Hồ sơ học viên chưa đầy đủ, vui lòng liên hệ quản trị viên!",
            ),
            FlashMessage::TeacherProfileMissing => (
                "教师资料不完整，请联系管理员！",
                "Teacher profile is incomplete, please contact an administrator!",
                "Hồ sơ giáo viên chưa đầy đủ, vui lòng liên hệ quản trị viên!",
            ),
            FlashMessage::LeaveSubmitted => ("请假申请已提交！", "Leave request submitted!", "Đã gửi đơn xin nghỉ!"),
            FlashMessage::LeaveSubmitFailed => ("提交失败，请重试！", "Submission failed, please try again!", "Gửi thất bại, vui lòng thử lại!"),
            FlashMessage::NotEnrolled => ("您未报名该课程", "You are not enrolled in this course", "Bạn chưa đăng ký khóa học này"),
            FlashMessage::LeaveApproved => ("请假申请已批准！", "Leave request approved!", "Đã duyệt đơn xin nghỉ!"),
            FlashMessage::LeaveRejected => ("请假申请已拒绝！", "Leave request rejected!", "Đã từ chối đơn xin nghỉ!"),
            FlashMessage::LeaveNotFound => ("请假申请不存在", "Leave request not found", "Không tìm thấy đơn xin nghỉ"),
            FlashMessage::LeaveAlreadyProcessed => (
                "该请假申请已处理",
                "This leave request has already been processed",
                "Đơn xin nghỉ này đã được xử lý",
            ),
            FlashMessage::OperationFailed => ("操作失败！", "Operation failed!", "Thao tác thất bại!"),
            FlashMessage::Enrolled => ("报名成功！", "Enrolled successfully!", "Đăng ký khóa học thành công!"),
            FlashMessage::AlreadyEnrolled => ("您已报名该课程", "You are already enrolled in this course", "Bạn đã đăng ký khóa học này"),
            FlashMessage::CourseFull => ("课程名额已满", "This course is full", "Khóa học đã đủ học viên"),
            FlashMessage::CourseNotFound => ("课程不存在", "Course not found", "Không tìm thấy khóa học"),
            FlashMessage::MaterialUploaded => ("学习资料已上传！", "Material uploaded!", "Đã tải lên tài liệu!"),
            FlashMessage::LessonScheduled => ("课程已安排！", "Lesson scheduled!", "Đã xếp lịch buổi học!"),
            FlashMessage::AvatarUpdated => ("头像已更新！", "Avatar updated!", "Đã cập nhật ảnh đại diện!"),
            FlashMessage::UploadFailed => ("上传失败！", "Upload failed!", "Tải lên thất bại!"),
        };
        match lang {
            Lang::Zh => zh,
            Lang::En => en,
            Lang::Vi => vi,
        }
    }
}
