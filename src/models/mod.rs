pub mod category;
pub mod comment;
pub mod post;
pub mod user;

pub use category::{Entity as Category, Model as CategoryModel};
pub use comment::{Entity as Comment, Model as CommentModel};
pub use post::{Entity as Post, Model as PostModel, PostStatus};
pub use user::{Entity as User, Model as UserModel};
